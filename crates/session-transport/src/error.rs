//! Transport error types.

use thiserror::Error;

/// Error type for identity-provider operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Invalid email or password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Provider rejected the request
    #[error("Provider error: HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// No session exists for the requested operation
    #[error("Not signed in")]
    NotSignedIn,

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// Network unavailable
    #[error("Network unavailable")]
    NetworkUnavailable,
}

impl TransportError {
    /// Returns true if this error is transient (connection failure, timeout,
    /// or a 5xx from the provider).
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::NetworkUnavailable => true,
            TransportError::Timeout => true,
            TransportError::Api { status, .. } => *status >= 500,
            TransportError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            _ => false,
        }
    }
}

/// Result type alias using TransportError.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_transient_network_unavailable() {
        assert!(TransportError::NetworkUnavailable.is_transient());
    }

    #[test]
    fn test_is_transient_timeout() {
        assert!(TransportError::Timeout.is_transient());
    }

    #[test]
    fn test_is_transient_server_error() {
        let err = TransportError::Api {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_is_not_transient_client_error() {
        let err = TransportError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_is_not_transient_invalid_credentials() {
        assert!(!TransportError::InvalidCredentials("bad password".to_string()).is_transient());
    }

    #[test]
    fn test_is_not_transient_not_signed_in() {
        assert!(!TransportError::NotSignedIn.is_transient());
    }
}
