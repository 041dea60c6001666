//! Mock capability handles for testing.
//!
//! Both mocks record what the manager does to them (hook calls, method
//! calls, delivered notifications) so tests can assert on it afterwards.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use plexus_core::{CapabilityError, CapabilityId, CapabilityResult, Descriptor, Value};
use plexus_events::{EventEmitter, EventHub};
use plexus_manager::{Capability, MethodFn, Notifications, PluginCapability, RequestSlot};

/// Hook run inside a mock plugin's `activate()`, with access to its request
/// slot.
pub type ActivateHook = Arc<dyn Fn(&RequestSlot) -> CapabilityResult<()> + Send + Sync>;

/// State shared by both mocks.
struct MockCore {
    id: CapabilityId,
    hub: EventHub,
    events: Vec<String>,
    methods: BTreeMap<String, MethodFn>,
    method_order: Vec<String>,
    calls: Mutex<Vec<(String, Value)>>,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    /// Remaining `activate()` / `deactivate()` calls that fail.
    activate_failures: AtomicUsize,
    deactivate_failures: AtomicUsize,
}

impl MockCore {
    fn new(id: &str) -> Self {
        Self {
            id: CapabilityId::from_static(id),
            hub: EventHub::empty(),
            events: Vec::new(),
            methods: BTreeMap::new(),
            method_order: Vec::new(),
            calls: Mutex::new(Vec::new()),
            activations: AtomicUsize::new(0),
            deactivations: AtomicUsize::new(0),
            activate_failures: AtomicUsize::new(0),
            deactivate_failures: AtomicUsize::new(0),
        }
    }

    fn set_events<I, S>(&mut self, events: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events = events.into_iter().map(Into::into).collect();
        self.hub = EventHub::new(self.events.iter().cloned());
    }

    fn add_method(&mut self, name: &str, method: MethodFn) {
        if self.methods.insert(name.to_string(), method).is_none() {
            self.method_order.push(name.to_string());
        }
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor::new(self.id.clone())
            .with_methods(self.method_order.iter().cloned())
            .with_events(self.events.iter().cloned())
    }

    fn invoke(&self, method: &str, value: Value) -> CapabilityResult<Value> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((method.to_string(), value.clone()));
        let handler = self
            .methods
            .get(method)
            .ok_or_else(|| CapabilityError::method(method, "not implemented by mock"))?;
        handler(value)
    }

    fn activate(&self) -> CapabilityResult<()> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.activate_failures) {
            return Err(CapabilityError::hook(&self.id, "mock activation failure"));
        }
        Ok(())
    }

    fn deactivate(&self) -> CapabilityResult<()> {
        self.deactivations.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.deactivate_failures) {
            return Err(CapabilityError::hook(&self.id, "mock deactivation failure"));
        }
        Ok(())
    }

    fn emit(&self, event: &str, value: &Value) -> usize {
        self.hub.emit(event, value).unwrap_or(0)
    }

    fn calls(&self) -> Vec<(String, Value)> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn echo() -> MethodFn {
    Arc::new(|value: Value| -> CapabilityResult<Value> { Ok(value) })
}

/// Spend one unit of a failure budget; `false` once it is exhausted.
fn take_failure(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// ---------------------------------------------------------------------------
// MockModule
// ---------------------------------------------------------------------------

/// Mock module handle.
///
/// Declared methods either run a supplied closure or echo their input.
pub struct MockModule {
    core: MockCore,
}

impl MockModule {
    /// Create a mock module with no methods and no events.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            core: MockCore::new(id),
        }
    }

    /// Declare the events this module emits.
    #[must_use]
    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.core.set_events(events);
        self
    }

    /// Add a method that returns its input unchanged.
    #[must_use]
    pub fn with_echo_method(mut self, name: &str) -> Self {
        self.core.add_method(name, echo());
        self
    }

    /// Add a method backed by `f`.
    #[must_use]
    pub fn with_method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Value) -> CapabilityResult<Value> + Send + Sync + 'static,
    {
        self.core.add_method(name, Arc::new(f));
        self
    }

    /// Make `activate()` fail after recording the call.
    #[must_use]
    pub fn failing_activation(self) -> Self {
        self.core.activate_failures.store(usize::MAX, Ordering::SeqCst);
        self
    }

    /// Make `deactivate()` fail after recording the call.
    #[must_use]
    pub fn failing_deactivation(self) -> Self {
        self.core.deactivate_failures.store(usize::MAX, Ordering::SeqCst);
        self
    }

    /// Descriptor declaring exactly this mock's methods and events.
    #[must_use]
    pub fn descriptor(&self) -> Descriptor {
        self.core.descriptor()
    }

    /// Emit `event` on this module's hub. Returns the number of subscribers
    /// reached (0 for an undeclared event).
    pub fn emit(&self, event: &str, value: Value) -> usize {
        self.core.emit(event, &value)
    }

    /// The module's event hub.
    #[must_use]
    pub fn hub(&self) -> &EventHub {
        &self.core.hub
    }

    /// Number of `activate()` calls.
    #[must_use]
    pub fn activation_count(&self) -> usize {
        self.core.activations.load(Ordering::SeqCst)
    }

    /// Number of `deactivate()` calls.
    #[must_use]
    pub fn deactivation_count(&self) -> usize {
        self.core.deactivations.load(Ordering::SeqCst)
    }

    /// Every method call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.core.calls()
    }
}

impl Capability for MockModule {
    fn provides(&self, method: &str) -> bool {
        self.core.methods.contains_key(method)
    }

    fn invoke(&self, method: &str, value: Value) -> CapabilityResult<Value> {
        self.core.invoke(method, value)
    }

    fn events(&self) -> &dyn EventEmitter {
        &self.core.hub
    }

    fn activate(&self) -> CapabilityResult<()> {
        self.core.activate()
    }

    fn deactivate(&self) -> CapabilityResult<()> {
        self.core.deactivate()
    }
}

// ---------------------------------------------------------------------------
// MockPlugin
// ---------------------------------------------------------------------------

/// A notification delivered to a [`MockPlugin`].
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedNotification {
    /// Capability that emitted the event.
    pub source: CapabilityId,
    /// Event key.
    pub key: String,
    /// Payload.
    pub value: Value,
}

/// Mock plugin handle.
///
/// Every notification declared with
/// [`with_notification`](Self::with_notification) gets a handler that
/// records the delivery.
pub struct MockPlugin {
    core: MockCore,
    slot: RequestSlot,
    notifs: Notifications,
    declared: Vec<(CapabilityId, String)>,
    received: Arc<Mutex<Vec<ReceivedNotification>>>,
    on_activate: Option<ActivateHook>,
}

impl MockPlugin {
    /// Create a mock plugin with no methods, events, or notifications.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self {
            core: MockCore::new(id),
            slot: RequestSlot::new(),
            notifs: Notifications::new(),
            declared: Vec::new(),
            received: Arc::new(Mutex::new(Vec::new())),
            on_activate: None,
        }
    }

    /// Declare the events this plugin emits.
    #[must_use]
    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.core.set_events(events);
        self
    }

    /// Add a method that returns its input unchanged.
    #[must_use]
    pub fn with_echo_method(mut self, name: &str) -> Self {
        self.core.add_method(name, echo());
        self
    }

    /// Add a method backed by `f`.
    #[must_use]
    pub fn with_method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(Value) -> CapabilityResult<Value> + Send + Sync + 'static,
    {
        self.core.add_method(name, Arc::new(f));
        self
    }

    /// Subscribe to `source`'s `key` event with a recording handler.
    #[must_use]
    pub fn with_notification(self, source: &str, key: &str) -> Self {
        self.with_notification_handler(source, key, |_| {})
    }

    /// Like [`with_notification`](Self::with_notification), then run
    /// `handler` with each payload once it is recorded.
    #[must_use]
    pub fn with_notification_handler<F>(mut self, source: &str, key: &str, handler: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let source = CapabilityId::from_static(source);
        let received = Arc::clone(&self.received);
        let source_clone = source.clone();
        let key_owned = key.to_string();
        self.notifs.insert(
            source.clone(),
            key,
            Arc::new(move |value: &Value| {
                received
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(ReceivedNotification {
                        source: source_clone.clone(),
                        key: key_owned.clone(),
                        value: value.clone(),
                    });
                handler(value);
            }),
        );
        self.declared.push((source, key.to_string()));
        self
    }

    /// Declare a notification without installing a handler for it.
    #[must_use]
    pub fn with_unhandled_notification(mut self, source: &str, key: &str) -> Self {
        self.declared
            .push((CapabilityId::from_static(source), key.to_string()));
        self
    }

    /// Run `hook` inside `activate()`, after the call is recorded.
    #[must_use]
    pub fn with_on_activate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RequestSlot) -> CapabilityResult<()> + Send + Sync + 'static,
    {
        self.on_activate = Some(Arc::new(hook));
        self
    }

    /// Make `activate()` fail after recording the call.
    #[must_use]
    pub fn failing_activation(self) -> Self {
        self.core.activate_failures.store(usize::MAX, Ordering::SeqCst);
        self
    }

    /// Make `deactivate()` fail after recording the call.
    #[must_use]
    pub fn failing_deactivation(self) -> Self {
        self.core.deactivate_failures.store(usize::MAX, Ordering::SeqCst);
        self
    }

    /// Make only the next `activate()` call fail.
    #[must_use]
    pub fn failing_activation_once(self) -> Self {
        self.core.activate_failures.store(1, Ordering::SeqCst);
        self
    }

    /// Make only the next `deactivate()` call fail.
    pub fn fail_next_deactivation(&self) {
        self.core.deactivate_failures.store(1, Ordering::SeqCst);
    }

    /// Descriptor declaring exactly this mock's methods, events, and
    /// notifications.
    #[must_use]
    pub fn descriptor(&self) -> Descriptor {
        self.declared
            .iter()
            .fold(self.core.descriptor(), |descriptor, (source, key)| {
                descriptor.with_notification(source.clone(), key.clone())
            })
    }

    /// Issue a request through the slot the manager installed.
    ///
    /// # Errors
    ///
    /// Fails like [`RequestSlot::request`].
    pub fn request(&self, target: &str, method: &str, value: Value) -> CapabilityResult<Value> {
        self.slot
            .request(&CapabilityId::from_static(target), method, value)
    }

    /// Emit `event` on this plugin's hub. Returns the number of subscribers
    /// reached (0 for an undeclared event).
    pub fn emit(&self, event: &str, value: Value) -> usize {
        self.core.emit(event, &value)
    }

    /// Notifications delivered so far, in order.
    #[must_use]
    pub fn received(&self) -> Vec<ReceivedNotification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget recorded notifications.
    pub fn clear_received(&self) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether the manager has installed a request dispatcher.
    #[must_use]
    pub fn has_request(&self) -> bool {
        self.slot.is_installed()
    }

    /// Number of `activate()` calls.
    #[must_use]
    pub fn activation_count(&self) -> usize {
        self.core.activations.load(Ordering::SeqCst)
    }

    /// Number of `deactivate()` calls.
    #[must_use]
    pub fn deactivation_count(&self) -> usize {
        self.core.deactivations.load(Ordering::SeqCst)
    }

    /// Every method call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.core.calls()
    }
}

impl Capability for MockPlugin {
    fn provides(&self, method: &str) -> bool {
        self.core.methods.contains_key(method)
    }

    fn invoke(&self, method: &str, value: Value) -> CapabilityResult<Value> {
        self.core.invoke(method, value)
    }

    fn events(&self) -> &dyn EventEmitter {
        &self.core.hub
    }

    fn activate(&self) -> CapabilityResult<()> {
        self.core.activate()?;
        match &self.on_activate {
            Some(hook) => hook(&self.slot),
            None => Ok(()),
        }
    }

    fn deactivate(&self) -> CapabilityResult<()> {
        self.core.deactivate()
    }
}

impl PluginCapability for MockPlugin {
    fn request_slot(&self) -> &RequestSlot {
        &self.slot
    }

    fn notifs(&self) -> &Notifications {
        &self.notifs
    }
}
