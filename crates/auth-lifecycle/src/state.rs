//! Auth states, events, and the pure transition function.
//!
//! ## State Diagram
//!
//! ```text
//! ┌───────────────┐ local-progress ┌────────────────────────┐
//! │   Anonymous   │ ─────────────► │ AnonymousWithProgress  │
//! └───────┬───────┘                └───────────┬────────────┘
//!         │ signed-in / initial (session)      │ signed-in / initial (session)
//!         ▼                                    ▼
//! ┌───────────────┐  signed-in   ┌───────────────┐
//! │ Authenticating│ ───────────► │ Authenticated │ ◄── token-refreshed ──┐
//! └───────┬───────┘              └──────┬────────┘                       │
//!         │ auth-error / signed-out     │ session-expired        ┌───────┴────────┐
//!         ▼                             └──────────────────────► │ SessionExpired │
//!   (back to anonymous tier)                                     └───────┬────────┘
//!                                       │ signed-out                     │ signed-out
//!                                       ▼                                ▼
//!                               ┌───────────────┐  (any other event decays to
//!                               │   SignedOut   │   the anonymous tier)
//!                               └───────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// Authentication state. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// No session, no local progress.
    Anonymous,
    /// No session, but the local progress store is non-empty.
    AnonymousWithProgress,
    /// An in-flight sign-up/sign-in operation; transient.
    Authenticating,
    /// Valid, non-expired session present.
    Authenticated,
    /// A session existed and lapsed; refresh is attempted automatically.
    SessionExpired,
    /// Explicit user-initiated departure from Authenticated.
    SignedOut,
}

impl AuthState {
    /// Returns true if the user has a valid session (Authenticated only).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated)
    }

    /// Returns true if the state is a transient/in-progress state.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthState::Authenticating)
    }
}

/// The triggers through which [`AuthState`] changes. Events are the only
/// way state changes; no component writes the state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEvent {
    /// The startup session lookup resolved (with or without a session).
    InitialSession,
    /// A sign-in completed.
    SignedIn,
    /// The user signed out.
    SignedOut,
    /// A replacement session was installed.
    TokenRefreshed,
    /// Profile data on the principal changed.
    UserUpdated,
    /// A password-recovery flow was entered.
    PasswordRecovery,
    /// The session lapsed (or a refresh failed).
    SessionExpired,
    /// An anonymous progress record was created.
    LocalProgressCreated,
    /// A sign-up/sign-in/reset operation failed.
    AuthError,
}

/// Context sampled at the moment of dispatch.
///
/// `has_local_progress` must be recomputed from the progress store for every
/// dispatch — progress can be created between transitions by unrelated UI
/// actions, so a cached snapshot would go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionContext {
    /// Whether a session accompanies the event.
    pub session_present: bool,
    /// Whether the local progress store currently holds any record.
    pub has_local_progress: bool,
}

/// The pure transition function: `(state, event, context) -> state`.
///
/// Total over every (state, event) pair: unhandled combinations return the
/// current state unchanged, never an error. Entry into `Authenticated` is
/// guarded on a session being present, preserving the invariant that
/// `Authenticated` always carries a session.
pub fn transition(current: AuthState, event: &AuthEvent, ctx: &TransitionContext) -> AuthState {
    use AuthEvent as E;
    use AuthState as S;

    let anonymous_tier = || {
        if ctx.has_local_progress {
            S::AnonymousWithProgress
        } else {
            S::Anonymous
        }
    };

    match (current, event) {
        (S::Anonymous | S::AnonymousWithProgress, E::SignedIn) if ctx.session_present => {
            S::Authenticated
        }
        (S::Anonymous | S::AnonymousWithProgress, E::InitialSession) => {
            if ctx.session_present {
                S::Authenticated
            } else {
                anonymous_tier()
            }
        }
        (S::Anonymous | S::AnonymousWithProgress, E::LocalProgressCreated) => {
            S::AnonymousWithProgress
        }

        (S::Authenticating, E::SignedIn) if ctx.session_present => S::Authenticated,
        (S::Authenticating, E::AuthError | E::SignedOut) => anonymous_tier(),

        (S::Authenticated, E::SignedOut) => S::SignedOut,
        (S::Authenticated, E::SessionExpired) => S::SessionExpired,
        (S::Authenticated, E::TokenRefreshed | E::UserUpdated) => S::Authenticated,

        (S::SessionExpired, E::TokenRefreshed | E::SignedIn) if ctx.session_present => {
            S::Authenticated
        }
        (S::SessionExpired, E::SignedOut) => S::SignedOut,

        (S::SignedOut, E::SignedIn) if ctx.session_present => S::Authenticated,
        (S::SignedOut, E::LocalProgressCreated) => S::AnonymousWithProgress,
        // Any other event decays an explicit sign-out back to the anonymous tier.
        (S::SignedOut, _) => anonymous_tier(),

        _ => current,
    }
}
