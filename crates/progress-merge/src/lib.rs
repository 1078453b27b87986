//! Merges anonymous local progress into the authenticated remote profile.
//!
//! When the auth state machine enters `Authenticated`, the reconciler pushes
//! whatever the local progress store holds into the profile tables, exactly
//! once per identity per process run. Merge failures are logged and the
//! local records kept, so the next process run retries; a failed merge never
//! blocks the authenticated state.

mod client;
mod reconciler;

pub use client::{
    HttpProfileStore, ProfileStore, RemoteOnboarding, RemoteWeeklyUsage,
};
pub use reconciler::{MergeReconciler, MergeReport};

use thiserror::Error;

/// Error type for profile merge operations.
#[derive(Error, Debug)]
pub enum MergeError {
    /// Profile API rejected the request
    #[error("Profile API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local progress store failure
    #[error("Storage error: {0}")]
    Storage(#[from] progress_store::StorageError),

    /// Malformed profile API base URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type for merge operations.
pub type MergeResult<T> = Result<T, MergeError>;
