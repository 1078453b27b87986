//! Transport trait definition.

use crate::{Session, SessionChangeCallback, Subscription, TransportResult};
use async_trait::async_trait;

/// Interface to the external identity provider.
///
/// Implementations own the current session and emit [`crate::SessionChange`]
/// events to subscribers whenever it changes. The auth state machine treats
/// those events — not the return values of these calls — as the source of
/// truth for state transitions.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Create an account. Providers with auto-confirm also sign the user in
    /// (and emit a signed-in change).
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> TransportResult<()>;

    /// Sign in with email and password.
    async fn sign_in_with_password(&self, email: &str, password: &str) -> TransportResult<()>;

    /// Sign out, invalidating the current session.
    async fn sign_out(&self) -> TransportResult<()>;

    /// Request a password-reset email.
    async fn request_password_reset(&self, email: &str, redirect_url: &str)
        -> TransportResult<()>;

    /// The session the transport currently holds, if any.
    fn current_session(&self) -> Option<Session>;

    /// Exchange the refresh token for a new session.
    async fn refresh_session(&self) -> TransportResult<Session>;

    /// Subscribe to session changes. The returned handle must be
    /// unsubscribed at teardown.
    fn subscribe(&self, callback: SessionChangeCallback) -> Subscription;
}
