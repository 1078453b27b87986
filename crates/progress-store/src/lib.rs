//! Local progress store for anonymous usage markers.
//!
//! This crate persists the progress an unauthenticated user accumulates
//! (onboarding step, weekly build counters, first-story milestone) so it
//! survives restarts and can later be merged into an authenticated profile.
//! Presence or absence of a record is itself meaningful: no records means no
//! anonymous progress.

mod file;
mod keys;
mod manager;
mod memory;
mod records;
mod traits;

pub use file::FileStorage;
pub use keys::ProgressKeys;
pub use manager::ProgressManager;
pub use memory::MemoryStorage;
pub use records::{OnboardingProgress, WeeklyUsage};
pub use traits::ProgressStorage;

use thiserror::Error;

/// Error type for progress storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
