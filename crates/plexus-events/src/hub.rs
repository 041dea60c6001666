//! Stock event emitter.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock};

use plexus_core::Value;
use tracing::{debug, trace, warn};

use crate::emitter::{EventCallback, EventEmitter, SubscriptionId};
use crate::error::{EventError, EventResult};

/// A fixed set of named events, each with its own subscriber list.
///
/// The event names are fixed at construction; subscribing to or emitting an
/// undeclared event is an error. Subscribers of one event are notified in
/// subscription order.
pub struct EventHub {
    events: BTreeSet<String>,
    subscribers: RwLock<HashMap<String, Vec<(SubscriptionId, EventCallback)>>>,
}

impl EventHub {
    /// Create a hub producing the given events.
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a hub that produces no events.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty::<String>())
    }

    /// Emit `event` to every current subscriber.
    ///
    /// Subscribers are snapshotted before delivery, so a callback may
    /// subscribe or unsubscribe without deadlocking. A subscription removed
    /// by an earlier callback of the same emit is skipped. A panicking
    /// callback is logged and does not stop delivery to the others.
    ///
    /// Returns the number of callbacks invoked.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownEvent`] if the hub does not produce `event`.
    pub fn emit(&self, event: &str, value: &Value) -> EventResult<usize> {
        self.check(event)?;

        let callbacks: Vec<(SubscriptionId, EventCallback)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();

        trace!(event, subscriber_count = callbacks.len(), "Emitting event");

        let mut delivered: usize = 0;
        for (id, callback) in callbacks {
            if !self.is_subscribed(event, id) {
                trace!(event, subscription_id = %id, "Subscription dropped during emit");
                continue;
            }
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(value);
            }));
            match result {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => {
                    warn!(event, subscription_id = %id, error = ?e, "Event subscriber panicked");
                },
            }
        }
        Ok(delivered)
    }

    fn is_subscribed(&self, event: &str, id: SubscriptionId) -> bool {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .is_some_and(|list| list.iter().any(|(sub, _)| *sub == id))
    }

    /// Names of the events this hub produces, sorted.
    #[must_use]
    pub fn events(&self) -> Vec<&str> {
        self.events.iter().map(String::as_str).collect()
    }

    /// Number of live subscriptions for `event`.
    #[must_use]
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    fn check(&self, event: &str) -> EventResult<()> {
        if self.events.contains(event) {
            Ok(())
        } else {
            Err(EventError::UnknownEvent {
                event: event.to_string(),
            })
        }
    }
}

impl EventEmitter for EventHub {
    fn emits(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    fn subscribe(&self, event: &str, callback: EventCallback) -> EventResult<SubscriptionId> {
        self.check(event)?;
        let id = SubscriptionId::new();
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push((id, callback));
        debug!(event, subscription_id = %id, "Subscribed to event");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        // The removed callback is dropped after the lock is released so its
        // Drop impl may touch the hub.
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .values_mut()
            .find_map(|list| {
                list.iter()
                    .position(|(sub, _)| *sub == id)
                    .map(|pos| list.remove(pos))
            });

        if removed.is_some() {
            debug!(subscription_id = %id, "Unsubscribed from event");
            true
        } else {
            false
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscription_count: usize = self
            .subscribers
            .read()
            .map(|s| s.values().map(Vec::len).sum())
            .unwrap_or_default();
        f.debug_struct("EventHub")
            .field("events", &self.events)
            .field("subscription_count", &subscription_count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, EventCallback) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let callback: EventCallback = Arc::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (count, callback)
    }

    #[test]
    fn test_emit_reaches_subscribers_of_that_event_only() {
        let hub = EventHub::new(["changed", "saved"]);
        let (changed, changed_cb) = counter();
        let (saved, saved_cb) = counter();
        hub.subscribe("changed", changed_cb).unwrap();
        hub.subscribe("saved", saved_cb).unwrap();

        assert_eq!(hub.emit("changed", &Value::Null).unwrap(), 1);
        assert_eq!(changed.load(Ordering::SeqCst), 1);
        assert_eq!(saved.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_emit_passes_payload_in_subscription_order() {
        let hub = EventHub::new(["changed"]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            hub.subscribe(
                "changed",
                Arc::new(move |value: &Value| {
                    seen.lock().unwrap().push(format!("{tag}:{value}"));
                }),
            )
            .unwrap();
        }

        hub.emit("changed", &Value::from(42)).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["first:42", "second:42"]);
    }

    #[test]
    fn test_unknown_event_rejected() {
        let hub = EventHub::new(["changed"]);
        let (_, cb) = counter();
        assert!(matches!(
            hub.subscribe("deleted", cb),
            Err(EventError::UnknownEvent { .. })
        ));
        assert!(hub.emit("deleted", &Value::Null).is_err());
        assert!(!hub.emits("deleted"));
        assert!(hub.emits("changed"));
    }

    #[test]
    fn test_unsubscribe() {
        let hub = EventHub::new(["changed"]);
        let (count, cb) = counter();
        let id = hub.subscribe("changed", cb).unwrap();
        assert_eq!(hub.subscriber_count("changed"), 1);

        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        assert_eq!(hub.emit("changed", &Value::Null).unwrap(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_subscriber_does_not_block_others() {
        let hub = EventHub::new(["changed"]);
        let panicking: EventCallback = Arc::new(|_| {
            panic!("boom");
        });
        hub.subscribe("changed", panicking).unwrap();
        let (count, cb) = counter();
        hub.subscribe("changed", cb).unwrap();

        assert_eq!(hub.emit("changed", &Value::Null).unwrap(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_unsubscribe_from_callback() {
        let hub = Arc::new(EventHub::new(["changed"]));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let hub_clone = Arc::clone(&hub);
        let slot_clone = Arc::clone(&slot);
        let id = hub
            .subscribe(
                "changed",
                Arc::new(move |_: &Value| {
                    if let Some(id) = *slot_clone.lock().unwrap() {
                        hub_clone.unsubscribe(id);
                    }
                }),
            )
            .unwrap();
        *slot.lock().unwrap() = Some(id);

        // Must not deadlock against the snapshot taken by emit.
        hub.emit("changed", &Value::Null).unwrap();
        assert_eq!(hub.subscriber_count("changed"), 0);
    }

    #[test]
    fn test_subscriber_removed_by_earlier_callback_is_skipped() {
        let hub = Arc::new(EventHub::new(["changed"]));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let (later, later_cb) = counter();

        let hub_clone = Arc::clone(&hub);
        let slot_clone = Arc::clone(&slot);
        hub.subscribe(
            "changed",
            Arc::new(move |_: &Value| {
                if let Some(id) = slot_clone.lock().unwrap().take() {
                    hub_clone.unsubscribe(id);
                }
            }),
        )
        .unwrap();
        *slot.lock().unwrap() = Some(hub.subscribe("changed", later_cb).unwrap());

        assert_eq!(hub.emit("changed", &Value::Null).unwrap(), 1);
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert_eq!(hub.subscriber_count("changed"), 1);
    }
}
