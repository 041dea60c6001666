//! Event emitter contract.

use std::sync::Arc;

use plexus_core::Value;
use uuid::Uuid;

use crate::error::EventResult;

/// Callback invoked with an event payload.
///
/// Callbacks run synchronously on the emitting thread and should return
/// quickly.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Registration handle for an emitter subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Typed event source implemented uniformly by modules and plugins.
pub trait EventEmitter: Send + Sync {
    /// Whether this emitter can produce the named event.
    fn emits(&self, event: &str) -> bool;

    /// Register `callback` for every future emission of `event`.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`](crate::EventError::UnknownEvent)
    /// if the emitter does not produce `event`.
    fn subscribe(&self, event: &str, callback: EventCallback) -> EventResult<SubscriptionId>;

    /// Remove a subscription. Returns `true` if it was present.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
