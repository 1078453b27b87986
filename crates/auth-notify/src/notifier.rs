//! Edge-triggered transition-to-notice mapping.

use crate::notice::{Notice, NoticeSink};
use auth_lifecycle::{AuthController, AuthState};
use std::sync::Arc;

/// Watches the transition feed and delivers [`Notice`]s on state edges.
///
/// Self-transitions (token refresh while authenticated, repeated expiry
/// events) never re-deliver a notice. Entering `SessionExpired` also spawns
/// one recovery refresh; if that refresh fails the machine re-dispatches
/// the expiry as a self-transition, so recovery is attempted once per
/// expiry edge, not in a loop.
pub struct AuthNotifier {
    sink: Arc<dyn NoticeSink>,
}

impl AuthNotifier {
    pub fn new(sink: Arc<dyn NoticeSink>) -> Self {
        Self { sink }
    }

    pub fn attach(&self, controller: &AuthController) {
        let sink = self.sink.clone();
        let weak = controller.downgrade();
        controller.on_transition(Box::new(move |t| {
            if t.from == t.to {
                return;
            }
            match t.to {
                AuthState::Authenticated => {
                    if t.from == AuthState::SessionExpired {
                        sink.deliver(&Notice::SessionRestored);
                    } else {
                        sink.deliver(&Notice::SignedIn {
                            email: t.identity.as_ref().and_then(|i| i.email.clone()),
                        });
                    }
                }
                AuthState::SignedOut => {
                    sink.deliver(&Notice::SignedOut);
                }
                AuthState::SessionExpired => {
                    sink.deliver(&Notice::SessionExpired);
                    if let Some(controller) = weak.upgrade() {
                        tracing::debug!("Spawning recovery refresh after session expiry");
                        tokio::spawn(async move {
                            controller.refresh_session().await;
                        });
                    }
                }
                AuthState::Anonymous | AuthState::AnonymousWithProgress => {
                    if let Some(message) = &t.error {
                        sink.deliver(&Notice::AuthFailed {
                            message: message.clone(),
                        });
                    }
                }
                AuthState::Authenticating => {}
            }
        }));
    }
}
