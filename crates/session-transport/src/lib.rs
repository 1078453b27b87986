//! Session transport: the thin interface to the external identity provider.
//!
//! The auth state machine consumes this crate through the [`SessionTransport`]
//! trait; [`HttpSessionTransport`] is the production implementation speaking
//! the provider's HTTP auth API. The transport owns the Session — callers get
//! read-only clones and never mutate one in place.

mod change;
mod error;
mod http;
mod session;
mod traits;

pub use change::{
    SessionChange, SessionChangeCallback, SessionChangeTag, SubscriberRegistry, Subscription,
};
pub use error::{TransportError, TransportResult};
pub use http::HttpSessionTransport;
pub use session::{Identity, Session};
pub use traits::SessionTransport;
