//! Auth state machine for the Fable client.
//!
//! This crate reconciles three independent sources of truth — the identity
//! provider's session feed, locally cached anonymous progress, and a
//! scheduled background refresh timer — into one observable state. State
//! only ever changes through [`AuthEvent`] dispatch; the transition function
//! is pure and total over every (state, event) pair.

mod controller;
mod error;
mod state;

pub use controller::{
    ActionOutcome, AuthController, AuthSnapshot, AuthTransition, RefreshPolicy, ResetRedirect,
    TransitionListener, WeakAuthController,
};
pub use error::{AuthError, AuthResult};
pub use session_transport::{Identity, Session};
pub use state::{transition, AuthEvent, AuthState, TransitionContext};
