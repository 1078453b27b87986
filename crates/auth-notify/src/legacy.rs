//! Callback-style compatibility surface for older UI code.

use auth_lifecycle::{AuthController, AuthState, Identity};

/// Legacy state-change callback: receives the provider-style state name.
pub type LegacyStateCallback = Box<dyn Fn(&'static str) + Send + Sync>;

/// Thin facade exposing the auth machine through the older call names.
/// New code should consume [`AuthController`] directly; this exists so
/// screens that predate the state machine keep working unchanged.
pub struct LegacyAuthApi {
    controller: AuthController,
}

impl LegacyAuthApi {
    pub fn new(controller: AuthController) -> Self {
        Self { controller }
    }

    pub fn is_logged_in(&self) -> bool {
        self.controller.state().is_authenticated()
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.controller.current_identity()
    }

    pub fn state_name(&self) -> &'static str {
        state_name(self.controller.state())
    }

    /// Register a callback fired with the new state name on every change.
    /// No-op transitions do not fire it.
    pub fn on_state_change(&self, callback: LegacyStateCallback) {
        self.controller.on_transition(Box::new(move |t| {
            if t.from != t.to {
                callback(state_name(t.to));
            }
        }));
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(), String> {
        let outcome = self.controller.sign_in(email, password).await;
        if outcome.success {
            Ok(())
        } else {
            Err(outcome.error.unwrap_or_else(|| "Sign-in failed".to_string()))
        }
    }

    pub async fn logout(&self) -> Result<(), String> {
        let outcome = self.controller.sign_out().await;
        if outcome.success {
            Ok(())
        } else {
            Err(outcome.error.unwrap_or_else(|| "Sign-out failed".to_string()))
        }
    }
}

fn state_name(state: AuthState) -> &'static str {
    match state {
        AuthState::Anonymous => "ANONYMOUS",
        AuthState::AnonymousWithProgress => "ANONYMOUS_WITH_PROGRESS",
        AuthState::Authenticating => "AUTHENTICATING",
        AuthState::Authenticated => "AUTHENTICATED",
        AuthState::SessionExpired => "SESSION_EXPIRED",
        AuthState::SignedOut => "SIGNED_OUT",
    }
}
