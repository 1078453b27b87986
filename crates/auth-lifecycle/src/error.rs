//! Auth error types.

use thiserror::Error;

/// Authentication error type.
///
/// Public controller actions never return this across the boundary; they
/// flatten it into an [`crate::ActionOutcome`]. It exists for internal
/// propagation and for the machine's observable `error` field.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Malformed credentials, rejected before any transport call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Identity provider error
    #[error("Transport error: {0}")]
    Transport(#[from] session_transport::TransportError),

    /// Local progress store error
    #[error("Storage error: {0}")]
    Storage(#[from] progress_store::StorageError),

    /// No session exists
    #[error("Not signed in")]
    NotSignedIn,
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
