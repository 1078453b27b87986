//! Session change feed: tags, payload, and the subscription registry.

use crate::Session;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// What kind of session change the provider reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionChangeTag {
    /// The session state known at startup was resolved.
    InitialSession,
    /// A sign-in (or sign-up with auto-confirm) completed.
    SignedIn,
    /// The user signed out.
    SignedOut,
    /// The access token was replaced.
    TokenRefreshed,
    /// Profile data on the principal changed.
    UserUpdated,
    /// The user entered a password-recovery flow.
    PasswordRecovery,
}

impl SessionChangeTag {
    /// Map a provider wire tag onto a change tag.
    ///
    /// Unrecognized tags are treated as `InitialSession`: the safest reading
    /// of an unknown event is "re-resolve whatever session exists now".
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "INITIAL_SESSION" => SessionChangeTag::InitialSession,
            "SIGNED_IN" => SessionChangeTag::SignedIn,
            "SIGNED_OUT" => SessionChangeTag::SignedOut,
            "TOKEN_REFRESHED" => SessionChangeTag::TokenRefreshed,
            "USER_UPDATED" => SessionChangeTag::UserUpdated,
            "PASSWORD_RECOVERY" => SessionChangeTag::PasswordRecovery,
            other => {
                tracing::debug!(tag = %other, "Unrecognized session change tag");
                SessionChangeTag::InitialSession
            }
        }
    }
}

/// A session change delivered to subscribers.
#[derive(Debug, Clone)]
pub struct SessionChange {
    /// What happened.
    pub tag: SessionChangeTag,
    /// The session after the change, if one exists.
    pub session: Option<Session>,
}

/// Callback type for session change notifications.
pub type SessionChangeCallback = Box<dyn Fn(&SessionChange) + Send + Sync>;

type Slots = Mutex<HashMap<u64, SessionChangeCallback>>;

/// Fan-out registry for session change subscribers.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    slots: Arc<Slots>,
    next_id: Arc<AtomicU64>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback. The returned handle must be kept alive and
    /// unsubscribed at teardown.
    pub fn subscribe(&self, callback: SessionChangeCallback) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots.lock().unwrap().insert(id, callback);
        Subscription {
            id,
            slots: Arc::downgrade(&self.slots),
            unsubscribed: false,
        }
    }

    /// Deliver a change to every live subscriber, in registration order of
    /// insertion into the map.
    pub fn notify(&self, change: &SessionChange) {
        let slots = self.slots.lock().unwrap();
        for callback in slots.values() {
            callback(change);
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    /// Whether no subscriber is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned at registration time; call [`Subscription::unsubscribe`]
/// on teardown.
///
/// Dropping the handle also unregisters the callback (a leaked callback must
/// never fire after its owner is gone), but logs a debug note since teardown
/// paths are expected to unsubscribe explicitly.
pub struct Subscription {
    id: u64,
    slots: Weak<Slots>,
    unsubscribed: bool,
}

impl Subscription {
    /// Remove the callback from the registry.
    pub fn unsubscribe(mut self) {
        self.detach();
        self.unsubscribed = true;
    }

    fn detach(&mut self) {
        if let Some(slots) = self.slots.upgrade() {
            slots.lock().unwrap().remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.unsubscribed {
            tracing::debug!(id = self.id, "Subscription dropped without unsubscribe");
            self.detach();
        }
    }
}
