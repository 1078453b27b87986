//! The auth controller: owns the observable state, drives the transition
//! function, and schedules the proactive refresh timer.

use crate::error::AuthResult;
use crate::state::{transition, AuthEvent, AuthState, TransitionContext};
use progress_store::ProgressManager;
use session_transport::{
    Identity, Session, SessionChangeTag, SessionTransport, Subscription, TransportError,
};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// How the controller schedules proactive token refresh.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    /// Lead time before expiry at which a refresh fires.
    pub buffer: Duration,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            buffer: Duration::from_secs(60),
        }
    }
}

/// Where password-reset emails send the user back to.
#[derive(Debug, Clone)]
pub struct ResetRedirect {
    pub url: String,
}

impl Default for ResetRedirect {
    fn default() -> Self {
        Self {
            url: "https://fable.app/reset".to_string(),
        }
    }
}

/// Flattened result of a user-facing auth action.
///
/// Actions never surface `Err` across the boundary; callers branch on
/// `success` and show `error` when present. State changes arrive through
/// the transition feed, not through these return values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub success: bool,
    pub error: Option<String>,
}

impl ActionOutcome {
    fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// One committed state transition, as delivered to listeners.
#[derive(Debug, Clone)]
pub struct AuthTransition {
    pub from: AuthState,
    pub to: AuthState,
    /// The event that drove the transition. `None` for direct commits
    /// (entering `Authenticating` when an action starts).
    pub event: Option<AuthEvent>,
    pub identity: Option<Identity>,
    pub error: Option<String>,
}

/// Callback type for transition notifications.
pub type TransitionListener = Box<dyn Fn(&AuthTransition) + Send + Sync>;

/// Point-in-time copy of the observable auth state.
#[derive(Debug, Clone)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub session: Option<Session>,
    pub identity: Option<Identity>,
    pub last_event: Option<AuthEvent>,
    pub error: Option<String>,
    pub is_loading: bool,
}

struct Observable {
    state: AuthState,
    session: Option<Session>,
    identity: Option<Identity>,
    last_event: Option<AuthEvent>,
    error: Option<String>,
    is_loading: bool,
}

impl Observable {
    fn snapshot(&self) -> AuthSnapshot {
        AuthSnapshot {
            state: self.state,
            session: self.session.clone(),
            identity: self.identity.clone(),
            last_event: self.last_event,
            error: self.error.clone(),
            is_loading: self.is_loading,
        }
    }
}

struct Inner {
    transport: Arc<dyn SessionTransport>,
    progress: Arc<ProgressManager>,
    policy: RefreshPolicy,
    reset_redirect: ResetRedirect,
    observable: Mutex<Observable>,
    // Serializes dispatches so context sampling and commit are atomic.
    dispatch_lock: Mutex<()>,
    listeners: Mutex<Vec<TransitionListener>>,
    refresh_timer: Mutex<Option<JoinHandle<()>>>,
    subscription: Mutex<Option<Subscription>>,
}

/// Coordinates the identity provider, the local progress store, and the
/// refresh timer into one observable auth state.
///
/// Cheap to clone; all clones share the same state. Call
/// [`AuthController::attach`] once after construction to start receiving
/// provider session changes, and [`AuthController::shutdown`] at teardown.
#[derive(Clone)]
pub struct AuthController {
    inner: Arc<Inner>,
}

/// Non-owning handle held by background tasks. A timer that fires after
/// [`AuthController::shutdown`] fails to upgrade and does nothing.
#[derive(Clone)]
pub struct WeakAuthController {
    inner: Weak<Inner>,
}

impl WeakAuthController {
    pub fn upgrade(&self) -> Option<AuthController> {
        self.inner.upgrade().map(|inner| AuthController { inner })
    }
}

impl AuthController {
    pub fn new(transport: Arc<dyn SessionTransport>, progress: Arc<ProgressManager>) -> Self {
        Self::with_policy(transport, progress, RefreshPolicy::default(), ResetRedirect::default())
    }

    pub fn with_policy(
        transport: Arc<dyn SessionTransport>,
        progress: Arc<ProgressManager>,
        policy: RefreshPolicy,
        reset_redirect: ResetRedirect,
    ) -> Self {
        let initial = if progress.has_any_progress() {
            AuthState::AnonymousWithProgress
        } else {
            AuthState::Anonymous
        };
        Self {
            inner: Arc::new(Inner {
                transport,
                progress,
                policy,
                reset_redirect,
                observable: Mutex::new(Observable {
                    state: initial,
                    session: None,
                    identity: None,
                    last_event: None,
                    error: None,
                    is_loading: false,
                }),
                dispatch_lock: Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                refresh_timer: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakAuthController {
        WeakAuthController {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Subscribe to the provider's session change feed and resolve the
    /// startup session.
    pub fn attach(&self) {
        let weak = self.downgrade();
        let subscription = self.inner.transport.subscribe(Box::new(move |change| {
            let Some(controller) = weak.upgrade() else {
                return;
            };
            let event = match change.tag {
                SessionChangeTag::InitialSession => AuthEvent::InitialSession,
                SessionChangeTag::SignedIn => AuthEvent::SignedIn,
                SessionChangeTag::SignedOut => AuthEvent::SignedOut,
                SessionChangeTag::TokenRefreshed => AuthEvent::TokenRefreshed,
                SessionChangeTag::UserUpdated => AuthEvent::UserUpdated,
                SessionChangeTag::PasswordRecovery => AuthEvent::PasswordRecovery,
            };
            controller.dispatch(event, change.session.clone());
        }));
        *self.inner.subscription.lock().unwrap() = Some(subscription);

        let startup = self.inner.transport.current_session();
        self.dispatch(AuthEvent::InitialSession, startup);
    }

    /// Cancel the refresh timer and detach from the provider feed.
    pub fn shutdown(&self) {
        if let Some(handle) = self.inner.refresh_timer.lock().unwrap().take() {
            handle.abort();
        }
        if let Some(subscription) = self.inner.subscription.lock().unwrap().take() {
            subscription.unsubscribe();
        }
        tracing::info!("Auth controller shut down");
    }

    /// Register a listener notified after every dispatch, including no-op
    /// transitions (listeners that care only about changes compare
    /// `from`/`to` themselves).
    pub fn on_transition(&self, listener: TransitionListener) {
        self.inner.listeners.lock().unwrap().push(listener);
    }

    pub fn state(&self) -> AuthState {
        self.inner.observable.lock().unwrap().state
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.inner.observable.lock().unwrap().snapshot()
    }

    /// Dispatch an event through the transition function and commit the
    /// result.
    ///
    /// Context is sampled fresh under the dispatch lock on every call:
    /// session presence from the event payload, local progress from the
    /// store. Unhandled (state, event) pairs commit a self-transition.
    pub fn dispatch(&self, event: AuthEvent, session: Option<Session>) {
        self.apply(Some(event), session, None);
    }

    /// Signal that an anonymous progress record was just created. Only
    /// dispatched from `Anonymous`; every other state either already tracks
    /// progress or does not care.
    pub fn notify_progress_created(&self) {
        if self.state() != AuthState::Anonymous {
            return;
        }
        self.dispatch(AuthEvent::LocalProgressCreated, None);
    }

    fn apply(&self, event: Option<AuthEvent>, session: Option<Session>, error: Option<String>) {
        let inner = &self.inner;
        let _guard = inner.dispatch_lock.lock().unwrap();

        let has_local_progress = inner.progress.has_any_progress();
        let ctx = TransitionContext {
            session_present: session.is_some(),
            has_local_progress,
        };

        let committed = {
            let mut obs = inner.observable.lock().unwrap();
            let from = obs.state;
            let to = match event {
                Some(event) => transition(from, &event, &ctx),
                // Direct commit: an action just started.
                None => AuthState::Authenticating,
            };

            match event {
                Some(AuthEvent::SignedOut) => {
                    obs.session = None;
                    obs.identity = None;
                }
                _ => {
                    if let Some(s) = &session {
                        obs.identity = Some(s.identity());
                        obs.session = session.clone();
                    } else if to == AuthState::Anonymous
                        || to == AuthState::AnonymousWithProgress
                    {
                        obs.session = None;
                        obs.identity = None;
                    } else if to == AuthState::SessionExpired {
                        // The lapsed session is no longer usable; only the
                        // identity is kept so the UI can say who expired.
                        obs.session = None;
                    }
                }
            }

            obs.state = to;
            obs.last_event = event;
            obs.error = error.clone();
            obs.is_loading = to == AuthState::Authenticating;

            AuthTransition {
                from,
                to,
                event,
                identity: obs.identity.clone(),
                error,
            }
        };

        if committed.from != committed.to {
            tracing::info!(
                from = ?committed.from,
                to = ?committed.to,
                event = ?committed.event,
                "Auth state transition"
            );
        }

        match committed.to {
            AuthState::Authenticated => {
                if let Some(s) = &session {
                    self.arm_refresh_timer(s);
                }
            }
            AuthState::SignedOut | AuthState::Anonymous | AuthState::AnonymousWithProgress => {
                self.cancel_refresh_timer();
            }
            _ => {}
        }

        let listeners = inner.listeners.lock().unwrap();
        for listener in listeners.iter() {
            listener(&committed);
        }
    }

    /// Schedule one proactive refresh at `expires_at - buffer`. Replaces
    /// any pending timer, so at most one exists at a time. A session
    /// already inside the buffer arms nothing; it is too late to get ahead
    /// of expiry, and reactive expiry handling takes over.
    fn arm_refresh_timer(&self, session: &Session) {
        let lead = (session.expires_at - chrono::Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        if lead <= self.inner.policy.buffer {
            tracing::debug!(
                user_id = %session.user_id,
                "Session expires within the refresh buffer, no timer armed"
            );
            self.cancel_refresh_timer();
            return;
        }
        let delay = lead - self.inner.policy.buffer;

        let weak = self.downgrade();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(controller) = weak.upgrade() else {
                return;
            };
            tracing::debug!("Proactive refresh timer fired");
            controller.refresh_session().await;
        });

        let mut slot = self.inner.refresh_timer.lock().unwrap();
        if let Some(previous) = slot.replace(handle) {
            previous.abort();
        }
    }

    fn cancel_refresh_timer(&self) {
        if let Some(handle) = self.inner.refresh_timer.lock().unwrap().take() {
            handle.abort();
        }
    }

    /// Create an account. On providers with auto-confirm this also signs
    /// the user in; the resulting signed-in change drives the state.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> ActionOutcome {
        if let Err(e) = validate_credentials(email, password) {
            return ActionOutcome::failed(e.to_string());
        }

        self.begin_authenticating();
        match self.inner.transport.sign_up(email, password, display_name).await {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => self.fail_authenticating(e),
        }
    }

    /// Sign in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> ActionOutcome {
        if let Err(e) = validate_credentials(email, password) {
            return ActionOutcome::failed(e.to_string());
        }

        self.begin_authenticating();
        match self.inner.transport.sign_in_with_password(email, password).await {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => self.fail_authenticating(e),
        }
    }

    /// Sign out. The provider's signed-out change drives the transition;
    /// the timer is cancelled here so it cannot fire mid-teardown.
    pub async fn sign_out(&self) -> ActionOutcome {
        self.cancel_refresh_timer();
        match self.inner.transport.sign_out().await {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Sign-out failed");
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    /// Request a password-reset email.
    pub async fn request_password_reset(&self, email: &str) -> ActionOutcome {
        if email.trim().is_empty() || !looks_like_email(email) {
            return ActionOutcome::failed("Enter a valid email address");
        }

        match self
            .inner
            .transport
            .request_password_reset(email, &self.inner.reset_redirect.url)
            .await
        {
            Ok(()) => ActionOutcome::ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Password reset request failed");
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    /// Exchange the refresh token for a new session. A failed refresh
    /// expires the session; it is never retried silently.
    pub async fn refresh_session(&self) -> ActionOutcome {
        match self.inner.transport.refresh_session().await {
            Ok(session) => {
                self.dispatch(AuthEvent::TokenRefreshed, Some(session));
                ActionOutcome::ok()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session refresh failed");
                self.dispatch(AuthEvent::SessionExpired, None);
                ActionOutcome::failed(e.to_string())
            }
        }
    }

    /// The identity the current session proves, if authenticated.
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.observable.lock().unwrap().identity.clone()
    }

    /// The progress manager this controller samples for context.
    pub fn progress(&self) -> &Arc<ProgressManager> {
        &self.inner.progress
    }

    /// The transport this controller is attached to.
    pub fn transport(&self) -> &Arc<dyn SessionTransport> {
        &self.inner.transport
    }

    fn begin_authenticating(&self) {
        self.apply(None, None, None);
    }

    // If a provider change event already moved us out of Authenticating
    // (the event won the race), the stale error is dropped.
    fn fail_authenticating(&self, error: TransportError) -> ActionOutcome {
        let message = error.to_string();
        if self.state() == AuthState::Authenticating {
            self.apply(Some(AuthEvent::AuthError), None, Some(message.clone()));
        } else {
            tracing::debug!(error = %message, "Auth error arrived after state moved on");
        }
        ActionOutcome::failed(message)
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    validate_fields(email, password).map_err(crate::AuthError::Validation)
}

fn validate_fields(email: &str, password: &str) -> Result<(), String> {
    if email.trim().is_empty() || !looks_like_email(email) {
        return Err("Enter a valid email address".to_string());
    }
    if password.len() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("a@b.co"));
        assert!(looks_like_email("user.name@sub.domain.io"));
        assert!(!looks_like_email("no-at-sign"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@nodot"));
        assert!(!looks_like_email("a@.leading"));
        assert!(!looks_like_email("a@trailing."));
    }

    #[test]
    fn test_validate_fields() {
        assert!(validate_fields("a@b.co", "longenough").is_ok());
        assert!(validate_fields("", "longenough").is_err());
        assert!(validate_fields("a@b.co", "short").is_err());
    }

    #[test]
    fn test_refresh_policy_default_buffer() {
        assert_eq!(RefreshPolicy::default().buffer, Duration::from_secs(60));
    }

    #[test]
    fn test_action_outcome_helpers() {
        let ok = ActionOutcome::ok();
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = ActionOutcome::failed("nope");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("nope"));
    }
}
