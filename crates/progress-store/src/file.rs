//! JSON-file storage backend.

use crate::{ProgressStorage, StorageError, StorageResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File-backed storage: a single JSON object persisted on every write.
///
/// This is the "survives restart" backend for anonymous progress. Writes go
/// through a temp file + rename so a crash mid-write never corrupts the
/// store.
pub struct FileStorage {
    path: PathBuf,
    data: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or create) a file-backed store at the given path.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Open the store at the standard progress file location.
    pub fn from_paths(paths: &fable_config::Paths) -> StorageResult<Self> {
        std::fs::create_dir_all(paths.base_dir())?;
        Self::open(paths.progress_file())
    }

    /// The file this store persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &HashMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProgressStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().unwrap();
        data.insert(key.to_string(), value.to_string());
        self.persist(&data)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().unwrap();
        Ok(data.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().unwrap();
        let removed = data.remove(key).is_some();
        if removed {
            self.persist(&data)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_storage_basic_ops() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("progress.json")).unwrap();

        storage.set("a", "1").unwrap();
        assert_eq!(storage.get("a").unwrap(), Some("1".to_string()));
        assert!(storage.has("a").unwrap());

        assert!(storage.delete("a").unwrap());
        assert!(!storage.delete("a").unwrap());
        assert_eq!(storage.get("a").unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("onboarding", r#"{"step":2}"#).unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get("onboarding").unwrap(),
            Some(r#"{"step":2}"#.to_string())
        );
    }

    #[test]
    fn test_file_storage_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("progress.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("k", "v").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_file_storage_from_paths() {
        let dir = tempdir().unwrap();
        let paths = fable_config::Paths::with_base_dir(dir.path().join("fable"));

        let storage = FileStorage::from_paths(&paths).unwrap();
        storage.set("k", "v").unwrap();

        assert_eq!(storage.path(), paths.progress_file());
        assert!(paths.progress_file().exists());
    }

    #[test]
    fn test_file_storage_empty_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("anything").unwrap(), None);
    }

    #[test]
    fn test_file_storage_corrupt_file_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(FileStorage::open(&path).is_err());
    }
}
