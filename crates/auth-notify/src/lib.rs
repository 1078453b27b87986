//! Presentation adapter for the auth state machine.
//!
//! Turns committed state transitions into user-facing notices, edge
//! triggered: a notice fires when the state changes into the interesting
//! state, never again while it stays there. Also carries the legacy
//! callback-style API older UI surfaces still consume.

mod legacy;
mod notice;
mod notifier;

pub use legacy::LegacyAuthApi;
pub use notice::{Notice, NoticeSink};
pub use notifier::AuthNotifier;
