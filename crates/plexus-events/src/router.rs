//! Broadcast router.
//!
//! Routing table `origin -> source -> key -> callback`. The origin is the
//! subscribing plugin, the source is the capability that emits the event.
//! Indexing by origin first makes it cheap to drop everything a plugin
//! subscribed to when it deactivates.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use plexus_core::{CapabilityId, Value};
use tracing::{debug, trace, warn};

use crate::emitter::EventCallback;

type SourceRoutes = BTreeMap<CapabilityId, HashMap<String, EventCallback>>;

/// Subscriber-indexed routing table for notifications.
///
/// Each origin holds at most one callback per `(source, key)`, so a
/// broadcast reaches every origin at most once. Origins are visited in
/// identifier order.
#[derive(Default)]
pub struct BroadcastRouter {
    routes: RwLock<BTreeMap<CapabilityId, SourceRoutes>>,
}

impl BroadcastRouter {
    /// Create an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `source`'s `key` events to `callback` on behalf of `origin`.
    ///
    /// Re-subscribing the same `(origin, source, key)` replaces the previous
    /// callback. Returns `true` if an entry was replaced.
    pub fn subscribe(
        &self,
        origin: &CapabilityId,
        source: &CapabilityId,
        key: &str,
        callback: EventCallback,
    ) -> bool {
        let replaced = self
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(origin.clone())
            .or_default()
            .entry(source.clone())
            .or_default()
            .insert(key.to_string(), callback);

        debug!(
            origin = %origin,
            source = %source,
            event = key,
            replaced = replaced.is_some(),
            "Registered notification route"
        );
        replaced.is_some()
    }

    /// Remove a single route. Returns `true` if it was present.
    pub fn unsubscribe(&self, origin: &CapabilityId, source: &CapabilityId, key: &str) -> bool {
        let mut routes = self.routes.write().unwrap_or_else(PoisonError::into_inner);
        let Some(sources) = routes.get_mut(origin) else {
            return false;
        };
        let Some(keys) = sources.get_mut(source) else {
            return false;
        };
        let removed = keys.remove(key);
        if keys.is_empty() {
            sources.remove(source);
        }
        if sources.is_empty() {
            routes.remove(origin);
        }
        drop(routes);

        removed.is_some()
    }

    /// Remove every route registered by `origin`, regardless of source or key.
    ///
    /// Returns the number of routes removed.
    pub fn remove_origin(&self, origin: &CapabilityId) -> usize {
        let removed = self
            .routes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(origin);

        let count = removed.as_ref().map_or(0, count_routes);
        if count > 0 {
            debug!(origin = %origin, count, "Removed notification routes");
        }
        count
    }

    /// Deliver `value` to every origin subscribed to `source`'s `key` event.
    ///
    /// Callbacks are collected under the read lock and invoked after it is
    /// released, so a callback may call back into the router (or into
    /// whatever owns it). Each route is looked up again right before its
    /// callback runs; one removed or replaced by an earlier callback is
    /// skipped. A panicking callback is logged and skipped. Having no
    /// subscriber is not an error.
    ///
    /// Returns the number of origins the event was delivered to.
    pub fn broadcast(&self, source: &CapabilityId, key: &str, value: &Value) -> usize {
        let destinations: Vec<(CapabilityId, EventCallback)> = self
            .routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|(origin, sources)| {
                sources
                    .get(source)
                    .and_then(|keys| keys.get(key))
                    .map(|callback| (origin.clone(), EventCallback::clone(callback)))
            })
            .collect();

        if destinations.is_empty() {
            trace!(source = %source, event = key, "No destination for broadcast");
            return 0;
        }

        let mut delivered: usize = 0;
        for (origin, callback) in destinations {
            if !self.routes_to(&origin, source, key, &callback) {
                trace!(origin = %origin, source = %source, event = key, "Route dropped mid-broadcast");
                continue;
            }
            trace!(origin = %origin, source = %source, event = key, "Delivering notification");
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(value);
            }));
            match result {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => {
                    warn!(
                        origin = %origin,
                        source = %source,
                        event = key,
                        error = ?e,
                        "Notification handler panicked"
                    );
                },
            }
        }
        delivered
    }

    /// Whether `callback` is still the live route for `(origin, source, key)`.
    fn routes_to(
        &self,
        origin: &CapabilityId,
        source: &CapabilityId,
        key: &str,
        callback: &EventCallback,
    ) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(origin)
            .and_then(|sources| sources.get(source))
            .and_then(|keys| keys.get(key))
            .is_some_and(|live| Arc::ptr_eq(live, callback))
    }

    /// Whether `origin` currently routes `source`'s `key` events.
    #[must_use]
    pub fn contains(&self, origin: &CapabilityId, source: &CapabilityId, key: &str) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(origin)
            .and_then(|sources| sources.get(source))
            .is_some_and(|keys| keys.contains_key(key))
    }

    /// The `(source, key)` pairs `origin` is subscribed to, sorted.
    #[must_use]
    pub fn routes_for(&self, origin: &CapabilityId) -> Vec<(CapabilityId, String)> {
        let routes = self.routes.read().unwrap_or_else(PoisonError::into_inner);
        let Some(sources) = routes.get(origin) else {
            return Vec::new();
        };
        let mut pairs: Vec<(CapabilityId, String)> = sources
            .iter()
            .flat_map(|(source, keys)| keys.keys().map(|key| (source.clone(), key.clone())))
            .collect();
        pairs.sort();
        pairs
    }

    /// Origins with at least one route, sorted.
    #[must_use]
    pub fn origins(&self) -> Vec<CapabilityId> {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Total number of routes across all origins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(count_routes)
            .sum()
    }

    /// Whether the router holds no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

fn count_routes(sources: &SourceRoutes) -> usize {
    sources.values().map(HashMap::len).sum()
}

impl std::fmt::Debug for BroadcastRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastRouter")
            .field("origins", &self.origins())
            .field("route_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(s: &str) -> CapabilityId {
        CapabilityId::from_static(s)
    }

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, EventCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let callback: EventCallback = Arc::new(move |value| {
            seen_clone.lock().unwrap().push(value.clone());
        });
        (seen, callback)
    }

    #[test]
    fn test_broadcast_reaches_matching_origins_once() {
        let router = BroadcastRouter::new();
        let (editor_seen, editor_cb) = recorder();
        let (linter_seen, linter_cb) = recorder();
        let (other_seen, other_cb) = recorder();

        router.subscribe(&id("editor"), &id("fs"), "changed", editor_cb);
        router.subscribe(&id("linter"), &id("fs"), "changed", linter_cb);
        router.subscribe(&id("other"), &id("fs"), "saved", other_cb);

        let delivered = router.broadcast(&id("fs"), "changed", &Value::from(42));
        assert_eq!(delivered, 2);
        assert_eq!(*editor_seen.lock().unwrap(), vec![Value::from(42)]);
        assert_eq!(*linter_seen.lock().unwrap(), vec![Value::from(42)]);
        assert!(other_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_broadcast_without_destination_is_dropped() {
        let router = BroadcastRouter::new();
        assert_eq!(router.broadcast(&id("fs"), "changed", &Value::Null), 0);
    }

    #[test]
    fn test_resubscribe_replaces_instead_of_duplicating() {
        let router = BroadcastRouter::new();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let count = Arc::clone(&count);
            router.subscribe(
                &id("editor"),
                &id("fs"),
                "changed",
                Arc::new(move |_: &Value| {
                    count.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        assert_eq!(router.len(), 1);
        router.broadcast(&id("fs"), "changed", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remove_origin_drops_all_its_routes() {
        let router = BroadcastRouter::new();
        let (_, cb) = recorder();
        router.subscribe(&id("editor"), &id("fs"), "changed", EventCallback::clone(&cb));
        router.subscribe(&id("editor"), &id("theme"), "themeChanged", EventCallback::clone(&cb));
        router.subscribe(&id("linter"), &id("fs"), "changed", cb);

        assert_eq!(router.remove_origin(&id("editor")), 2);
        assert!(router.routes_for(&id("editor")).is_empty());
        assert_eq!(router.origins(), vec![id("linter")]);
        assert_eq!(router.remove_origin(&id("editor")), 0);
    }

    #[test]
    fn test_unsubscribe_prunes_empty_levels() {
        let router = BroadcastRouter::new();
        let (_, cb) = recorder();
        router.subscribe(&id("editor"), &id("fs"), "changed", cb);

        assert!(router.contains(&id("editor"), &id("fs"), "changed"));
        assert!(router.unsubscribe(&id("editor"), &id("fs"), "changed"));
        assert!(!router.unsubscribe(&id("editor"), &id("fs"), "changed"));
        assert!(router.is_empty());
        assert!(router.origins().is_empty());
    }

    #[test]
    fn test_routes_for_is_sorted() {
        let router = BroadcastRouter::new();
        let (_, cb) = recorder();
        router.subscribe(&id("editor"), &id("theme"), "themeChanged", EventCallback::clone(&cb));
        router.subscribe(&id("editor"), &id("fs"), "saved", EventCallback::clone(&cb));
        router.subscribe(&id("editor"), &id("fs"), "changed", cb);

        assert_eq!(
            router.routes_for(&id("editor")),
            vec![
                (id("fs"), "changed".to_string()),
                (id("fs"), "saved".to_string()),
                (id("theme"), "themeChanged".to_string()),
            ]
        );
    }

    #[test]
    fn test_callback_may_remove_its_own_origin() {
        let router = Arc::new(BroadcastRouter::new());
        let router_clone = Arc::clone(&router);
        router.subscribe(
            &id("editor"),
            &id("fs"),
            "changed",
            Arc::new(move |_: &Value| {
                router_clone.remove_origin(&CapabilityId::from_static("editor"));
            }),
        );

        // Must not deadlock: the read lock is released before delivery.
        assert_eq!(router.broadcast(&id("fs"), "changed", &Value::Null), 1);
        assert!(router.is_empty());
    }

    #[test]
    fn test_panicking_handler_does_not_block_other_origins() {
        let router = BroadcastRouter::new();
        let panicking: EventCallback = Arc::new(|_| {
            panic!("handler failure");
        });
        let (seen, cb) = recorder();
        router.subscribe(&id("aaa"), &id("fs"), "changed", panicking);
        router.subscribe(&id("zzz"), &id("fs"), "changed", cb);

        assert_eq!(router.broadcast(&id("fs"), "changed", &Value::Null), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_origin_dropped_by_earlier_handler_is_skipped() {
        let router = Arc::new(BroadcastRouter::new());
        let router_clone = Arc::clone(&router);
        let (seen, zzz_cb) = recorder();
        router.subscribe(
            &id("aaa"),
            &id("m"),
            "changed",
            Arc::new(move |_: &Value| {
                router_clone.remove_origin(&CapabilityId::from_static("zzz"));
            }),
        );
        router.subscribe(&id("zzz"), &id("m"), "changed", zzz_cb);

        assert_eq!(router.broadcast(&id("m"), "changed", &Value::from(42)), 1);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(router.origins(), vec![id("aaa")]);
    }

    #[test]
    fn test_route_replaced_mid_broadcast_skips_stale_callback() {
        let router = Arc::new(BroadcastRouter::new());
        let router_clone = Arc::clone(&router);
        let (stale_seen, stale_cb) = recorder();
        let (fresh_seen, fresh_cb) = recorder();
        router.subscribe(
            &id("aaa"),
            &id("m"),
            "changed",
            Arc::new(move |_: &Value| {
                router_clone.subscribe(
                    &CapabilityId::from_static("zzz"),
                    &CapabilityId::from_static("m"),
                    "changed",
                    EventCallback::clone(&fresh_cb),
                );
            }),
        );
        router.subscribe(&id("zzz"), &id("m"), "changed", stale_cb);

        assert_eq!(router.broadcast(&id("m"), "changed", &Value::Null), 1);
        assert!(stale_seen.lock().unwrap().is_empty());
        assert!(fresh_seen.lock().unwrap().is_empty());

        assert_eq!(router.broadcast(&id("m"), "changed", &Value::Null), 2);
        assert_eq!(fresh_seen.lock().unwrap().len(), 1);
    }
}
