//! High-level API over a progress storage backend.

use crate::records::{OnboardingProgress, WeeklyUsage};
use crate::{ProgressKeys, ProgressStorage, StorageError, StorageResult};
use chrono::{DateTime, Utc};

/// High-level API for reading and writing anonymous progress records.
///
/// The manager owns a boxed backend so callers never care whether progress
/// lives in a file or in memory. All reads go straight to the backend; there
/// is deliberately no caching layer, because "does any progress exist" must
/// always reflect the store at the moment it is asked.
pub struct ProgressManager {
    storage: Box<dyn ProgressStorage>,
}

impl ProgressManager {
    /// Create a new manager with the given storage backend.
    pub fn new(storage: Box<dyn ProgressStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Onboarding
    // ==========================================

    /// Store the onboarding progress record.
    pub fn set_onboarding(&self, record: &OnboardingProgress) -> StorageResult<()> {
        let json =
            serde_json::to_string(record).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(ProgressKeys::ONBOARDING, &json)
    }

    /// Retrieve the onboarding progress record.
    pub fn get_onboarding(&self) -> StorageResult<Option<OnboardingProgress>> {
        match self.storage.get(ProgressKeys::ONBOARDING)? {
            Some(json) => {
                let record: OnboardingProgress = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Delete the onboarding progress record.
    pub fn delete_onboarding(&self) -> StorageResult<bool> {
        self.storage.delete(ProgressKeys::ONBOARDING)
    }

    // ==========================================
    // Weekly usage
    // ==========================================

    /// Store the weekly usage record.
    pub fn set_weekly_usage(&self, record: &WeeklyUsage) -> StorageResult<()> {
        let json =
            serde_json::to_string(record).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(ProgressKeys::WEEKLY_USAGE, &json)
    }

    /// Retrieve the weekly usage record.
    pub fn get_weekly_usage(&self) -> StorageResult<Option<WeeklyUsage>> {
        match self.storage.get(ProgressKeys::WEEKLY_USAGE)? {
            Some(json) => {
                let record: WeeklyUsage = serde_json::from_str(&json)
                    .map_err(|e| StorageError::Encoding(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Delete the weekly usage record.
    pub fn delete_weekly_usage(&self) -> StorageResult<bool> {
        self.storage.delete(ProgressKeys::WEEKLY_USAGE)
    }

    /// Record a story build at the given instant.
    ///
    /// Upserts the usage row for the current week window (a new window resets
    /// the counter) and sets the first-story milestone on the first build.
    pub fn record_build(&self, now: DateTime<Utc>) -> StorageResult<WeeklyUsage> {
        let week_start = WeeklyUsage::week_start_for(now);

        let record = match self.get_weekly_usage()? {
            Some(existing) if existing.week_start == week_start => WeeklyUsage {
                week_start,
                builds_this_week: existing.builds_this_week + 1,
                last_build_at: now,
            },
            _ => WeeklyUsage {
                week_start,
                builds_this_week: 1,
                last_build_at: now,
            },
        };

        self.set_weekly_usage(&record)?;

        if !self.has_first_story()? {
            self.set_first_story()?;
            tracing::debug!("First story milestone recorded");
        }

        Ok(record)
    }

    // ==========================================
    // First-story milestone
    // ==========================================

    /// Set the first-story milestone flag.
    pub fn set_first_story(&self) -> StorageResult<()> {
        self.storage.set(ProgressKeys::FIRST_STORY, "true")
    }

    /// Check the first-story milestone flag.
    pub fn has_first_story(&self) -> StorageResult<bool> {
        self.storage.has(ProgressKeys::FIRST_STORY)
    }

    /// Delete the first-story milestone flag.
    pub fn delete_first_story(&self) -> StorageResult<bool> {
        self.storage.delete(ProgressKeys::FIRST_STORY)
    }

    // ==========================================
    // Aggregate queries
    // ==========================================

    /// Whether any anonymous progress record exists right now.
    ///
    /// Always recomputed from the backend, never cached.
    pub fn has_any_progress(&self) -> bool {
        let check = || -> StorageResult<bool> {
            Ok(self.storage.has(ProgressKeys::ONBOARDING)?
                || self.storage.has(ProgressKeys::WEEKLY_USAGE)?
                || self.storage.has(ProgressKeys::FIRST_STORY)?)
        };

        match check() {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Progress store read failed, assuming no progress: {}", e);
                false
            }
        }
    }

    /// Remove every progress record.
    pub fn clear_all(&self) -> StorageResult<()> {
        let _ = self.storage.delete(ProgressKeys::ONBOARDING);
        let _ = self.storage.delete(ProgressKeys::WEEKLY_USAGE);
        let _ = self.storage.delete(ProgressKeys::FIRST_STORY);
        Ok(())
    }
}
