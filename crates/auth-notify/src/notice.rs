//! User-facing notices.

use serde::Serialize;

/// A notice the UI should surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// The user just became authenticated.
    SignedIn { email: Option<String> },
    /// The user signed out.
    SignedOut,
    /// The session lapsed; a recovery refresh is underway.
    SessionExpired,
    /// A lapsed session was recovered without re-entering credentials.
    SessionRestored,
    /// A sign-up/sign-in attempt failed.
    AuthFailed { message: String },
}

/// Where notices go. Implemented by toasts, banners, or the test recorder.
pub trait NoticeSink: Send + Sync {
    fn deliver(&self, notice: &Notice);
}
