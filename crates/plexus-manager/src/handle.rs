//! Capability handle traits.
//!
//! A handle is the live object behind a descriptor. The manager never owns
//! its state; it only toggles it through the hooks below and, for plugins,
//! fills in the request slot and reads the notification table.

use std::collections::HashMap;
use std::sync::Arc;

use plexus_core::{CapabilityId, CapabilityResult, Value};
use plexus_events::{EventCallback, EventEmitter};

use crate::request::RequestSlot;

/// A method bound to its handle, as stored in the exposed-API namespace.
pub type MethodFn = Arc<dyn Fn(Value) -> CapabilityResult<Value> + Send + Sync>;

/// Live object implementing a module descriptor.
///
/// Plugins implement the extended [`PluginCapability`] trait.
pub trait Capability: Send + Sync {
    /// Whether the handle implements `method`.
    ///
    /// Declared methods the handle does not provide are left out of the
    /// namespace.
    fn provides(&self, method: &str) -> bool;

    /// Run `method` with `value`.
    ///
    /// Only called for names [`provides`](Self::provides) accepted.
    ///
    /// # Errors
    ///
    /// Whatever the method fails with; the manager returns it unchanged.
    fn invoke(&self, method: &str, value: Value) -> CapabilityResult<Value>;

    /// Event source for the events this capability declares.
    fn events(&self) -> &dyn EventEmitter;

    /// Called last when the capability becomes active.
    ///
    /// # Errors
    ///
    /// A failure is returned to whoever asked for the activation. Wiring done
    /// before the hook is not rolled back.
    fn activate(&self) -> CapabilityResult<()> {
        Ok(())
    }

    /// Called last when the capability is deactivated.
    ///
    /// # Errors
    ///
    /// A failure is returned to whoever asked for the deactivation.
    fn deactivate(&self) -> CapabilityResult<()> {
        Ok(())
    }
}

/// Live object implementing a plugin descriptor.
pub trait PluginCapability: Capability {
    /// Slot the manager fills with a dispatcher while the plugin is active.
    fn request_slot(&self) -> &RequestSlot;

    /// Handlers for the notifications the plugin declares.
    fn notifs(&self) -> &Notifications;
}

/// Bind `method` on `handle` into a namespace entry.
pub(crate) fn bind<H>(handle: &Arc<H>, method: &str) -> MethodFn
where
    H: Capability + ?Sized + 'static,
{
    let handle = Arc::clone(handle);
    let method = method.to_string();
    Arc::new(move |value| handle.invoke(&method, value))
}

/// Notification handlers keyed by source capability and event key.
#[derive(Clone, Default)]
pub struct Notifications {
    handlers: HashMap<CapabilityId, HashMap<String, EventCallback>>,
}

impl Notifications {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn on(mut self, source: CapabilityId, key: impl Into<String>, callback: EventCallback) -> Self {
        self.insert(source, key, callback);
        self
    }

    /// Set the handler for `source`'s `key` event, replacing any previous one.
    pub fn insert(&mut self, source: CapabilityId, key: impl Into<String>, callback: EventCallback) {
        self.handlers
            .entry(source)
            .or_default()
            .insert(key.into(), callback);
    }

    /// Handler for `source`'s `key` event.
    #[must_use]
    pub fn get(&self, source: &CapabilityId, key: &str) -> Option<EventCallback> {
        self.handlers
            .get(source)
            .and_then(|keys| keys.get(key))
            .map(EventCallback::clone)
    }

    /// Number of handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.values().map(HashMap::len).sum()
    }

    /// Whether the table holds no handlers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.values().all(HashMap::is_empty)
    }
}

impl std::fmt::Debug for Notifications {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<String> = self
            .handlers
            .iter()
            .flat_map(|(source, keys)| keys.keys().map(move |key| format!("{source}.{key}")))
            .collect();
        keys.sort();
        f.debug_struct("Notifications").field("handlers", &keys).finish()
    }
}
