//! The application manager.
//!
//! Owns the registry and the broadcast router, runs the activation state
//! machine, and wires plugin requests into the exposed-API namespace.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Weak};

use plexus_core::{CapabilityError, CapabilityId, CapabilityKind, CapabilityResult, Descriptor, Value};
use plexus_events::{BroadcastRouter, EventCallback, SubscriptionId};
use tracing::{debug, info, trace, warn};

use crate::error::{ManagerError, ManagerResult};
use crate::handle::{Capability, MethodFn, PluginCapability};
use crate::namespace::MethodTable;
use crate::registry::{CapabilityStatus, Handle, RegistryEntry};

/// Event a bootstrap module emits to request activation of a capability.
pub const BOOTSTRAP_ACTIVATE_EVENT: &str = "activate";

/// Event a bootstrap module emits to request deactivation of a capability.
pub const BOOTSTRAP_DEACTIVATE_EVENT: &str = "deactivate";

/// A module registration: descriptor plus live handle.
pub type ModuleRegistration = (Descriptor, Arc<dyn Capability>);

/// A plugin registration: descriptor plus live handle.
pub type PluginRegistration = (Descriptor, Arc<dyn PluginCapability>);

#[derive(Debug, Clone, Copy)]
enum Signal {
    Activate,
    Deactivate,
}

/// Registry and lifecycle controller for modules and plugins.
///
/// Modules are wired and active as soon as the manager exists. Plugins stay
/// dormant until [`activate`](Self::activate) is called, either directly or
/// through the bootstrap module's `activate` event.
///
/// The manager is always handed out as `Arc<AppManager>`; plugin request
/// dispatchers and bootstrap subscriptions only hold weak references to it.
pub struct AppManager {
    this: Weak<AppManager>,
    entries: HashMap<CapabilityId, RegistryEntry>,
    modules: Vec<CapabilityId>,
    plugins: Vec<CapabilityId>,
    router: Arc<BroadcastRouter>,
    bootstrap: Option<(CapabilityId, Vec<SubscriptionId>)>,
}

impl AppManager {
    /// Start building a manager.
    #[must_use]
    pub fn builder() -> AppManagerBuilder {
        AppManagerBuilder::new()
    }

    /// Create a manager from module and plugin registrations.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::DuplicateCapability`] if a type is registered twice
    /// - [`ManagerError::Configuration`] if `bootstrap` does not name a module
    ///   declaring and emitting both `activate` and `deactivate`
    /// - [`ManagerError::Capability`] if a descriptor is invalid
    pub fn new(
        modules: Vec<ModuleRegistration>,
        plugins: Vec<PluginRegistration>,
        bootstrap: Option<&str>,
    ) -> ManagerResult<Arc<Self>> {
        let mut entries = HashMap::with_capacity(modules.len().saturating_add(plugins.len()));
        let mut module_ids = Vec::with_capacity(modules.len());
        let mut plugin_ids = Vec::with_capacity(plugins.len());

        for (descriptor, handle) in modules {
            descriptor.validate()?;
            if !descriptor.notifications.is_empty() {
                warn!(
                    capability = %descriptor.id,
                    count = descriptor.notifications.len(),
                    "Modules do not receive notifications; ignoring declared subscriptions"
                );
            }
            module_ids.push(descriptor.id.clone());
            insert_entry(&mut entries, RegistryEntry::new(descriptor, Handle::Module(handle)))?;
        }

        for (descriptor, handle) in plugins {
            descriptor.validate()?;
            plugin_ids.push(descriptor.id.clone());
            insert_entry(&mut entries, RegistryEntry::new(descriptor, Handle::Plugin(handle)))?;
        }

        let bootstrap = bootstrap
            .map(|name| check_bootstrap(&entries, name))
            .transpose()?;

        let router = Arc::new(BroadcastRouter::new());
        let manager = Arc::new_cyclic(|this: &Weak<Self>| {
            for id in &module_ids {
                if let Some(entry) = entries.get(id) {
                    wire_api(entry, &router);
                    entry.set_status(CapabilityStatus::Active);
                }
            }

            let bootstrap = bootstrap.map(|id| {
                let subscriptions = entries
                    .get(&id)
                    .map(|entry| subscribe_bootstrap(entry, this))
                    .unwrap_or_default();
                (id, subscriptions)
            });

            Self {
                this: Weak::clone(this),
                entries,
                modules: module_ids,
                plugins: plugin_ids,
                router,
                bootstrap,
            }
        });

        info!(
            modules = manager.modules.len(),
            plugins = manager.plugins.len(),
            bootstrap = ?manager.bootstrap.as_ref().map(|(id, _)| id.as_str()),
            "Capability manager initialised"
        );
        Ok(manager)
    }

    /// Activate a capability.
    ///
    /// Wires declared events into the broadcast path and declared methods
    /// into the namespace. For a plugin, also installs its request dispatcher
    /// and registers its notification routes. The handle's `activate()` hook
    /// runs last, with the capability already marked active.
    ///
    /// Activating an active capability does nothing, unless its last
    /// `activate()` hook failed: then only the hook runs again.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotRegistered`] for an unknown type, or the
    /// hook's error unchanged. Wiring is not rolled back when the hook fails.
    pub fn activate(&self, id: &CapabilityId) -> ManagerResult<()> {
        let entry = self.entry(id)?;
        let _transition = entry.lock_transition();

        if entry.status() == CapabilityStatus::Active {
            if !entry.hook_pending() {
                debug!(capability = %id, "Capability already active");
                return Ok(());
            }
            info!(capability = %id, "Retrying activation hook");
            entry.run_hook()?;
            info!(capability = %id, "Capability activated");
            return Ok(());
        }

        info!(capability = %id, kind = %entry.handle.kind(), "Activating capability");
        wire_api(entry, &self.router);
        if let Handle::Plugin(plugin) = &entry.handle {
            self.install_request(id, plugin.as_ref());
            self.wire_notifications(entry, plugin.as_ref());
        }
        entry.set_status(CapabilityStatus::Active);

        entry.run_hook()?;
        info!(capability = %id, "Capability activated");
        Ok(())
    }

    /// Deactivate a capability.
    ///
    /// Empties its namespace and releases its emitter subscriptions. For a
    /// plugin, also clears the request slot and drops every notification
    /// route it registered. The handle's `deactivate()` hook runs last.
    ///
    /// Deactivating an inactive capability does nothing, unless its last
    /// `deactivate()` hook failed: then only the hook runs again.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::NotRegistered`] for an unknown type, or the
    /// hook's error unchanged. The capability stays unwired when the hook
    /// fails.
    pub fn deactivate(&self, id: &CapabilityId) -> ManagerResult<()> {
        let entry = self.entry(id)?;
        let _transition = entry.lock_transition();

        if entry.status() != CapabilityStatus::Active {
            if !entry.hook_pending() {
                debug!(capability = %id, "Capability not active");
                return Ok(());
            }
            info!(capability = %id, "Retrying deactivation hook");
            entry.run_hook()?;
            info!(capability = %id, "Capability deactivated");
            return Ok(());
        }

        info!(capability = %id, kind = %entry.handle.kind(), "Deactivating capability");
        entry.replace_api(MethodTable::default());
        if let Handle::Plugin(plugin) = &entry.handle {
            plugin.request_slot().clear();
            self.router.remove_origin(id);
        }
        release_events(entry);
        entry.set_status(CapabilityStatus::Registered);

        entry.run_hook()?;
        info!(capability = %id, "Capability deactivated");
        Ok(())
    }

    /// Deactivate every active capability: plugins first, then modules, each
    /// in reverse registration order.
    ///
    /// Failures do not stop the sweep; they are logged and returned.
    pub fn deactivate_all(&self) -> Vec<(CapabilityId, ManagerError)> {
        let mut failures = Vec::new();
        for id in self.plugins.iter().rev().chain(self.modules.iter().rev()) {
            if let Err(e) = self.deactivate(id) {
                warn!(capability = %id, error = %e, "Failed to deactivate capability");
                failures.push((id.clone(), e));
            }
        }
        failures
    }

    /// Call `method` on `target` through the exposed-API namespace.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::NotRegistered`] for an unknown target
    /// - [`ManagerError::MethodNotFound`] if the method is not live, which
    ///   includes every method of an inactive target
    /// - [`ManagerError::Capability`] with the method's own error
    pub fn call(&self, target: &CapabilityId, method: &str, value: Value) -> ManagerResult<Value> {
        let bound = self
            .entry(target)?
            .method(method)
            .ok_or_else(|| ManagerError::MethodNotFound {
                capability: target.clone(),
                method: method.to_string(),
            })?;

        trace!(capability = %target, method, "Calling method");
        Ok(bound(value)?)
    }

    /// The live bound method `target.name`, if any.
    #[must_use]
    pub fn method(&self, target: &CapabilityId, name: &str) -> Option<MethodFn> {
        self.entries.get(target)?.method(name)
    }

    /// Names in `target`'s live namespace, in declaration order.
    ///
    /// Empty for an inactive capability, `None` for an unknown one.
    #[must_use]
    pub fn methods(&self, target: &CapabilityId) -> Option<Vec<String>> {
        self.entries.get(target).map(RegistryEntry::method_names)
    }

    /// Deliver `source`'s `key` event to every subscribed plugin.
    ///
    /// Returns the number of plugins the event reached.
    pub fn broadcast(&self, source: &CapabilityId, key: &str, value: &Value) -> usize {
        let delivered = self.router.broadcast(source, key, value);
        debug!(source = %source, event = key, delivered, "Broadcast event");
        delivered
    }

    /// Lifecycle state of `id`, or `None` if it is not registered.
    #[must_use]
    pub fn status(&self, id: &CapabilityId) -> Option<CapabilityStatus> {
        self.entries.get(id).map(RegistryEntry::status)
    }

    /// Whether `id` is registered and active.
    #[must_use]
    pub fn is_active(&self, id: &CapabilityId) -> bool {
        self.status(id) == Some(CapabilityStatus::Active)
    }

    /// Whether the hook of the last transition of `id` failed and has not
    /// yet been retried successfully.
    #[must_use]
    pub fn hook_pending(&self, id: &CapabilityId) -> bool {
        self.entries.get(id).is_some_and(RegistryEntry::hook_pending)
    }

    /// Whether `id` is a module or a plugin.
    #[must_use]
    pub fn kind(&self, id: &CapabilityId) -> Option<CapabilityKind> {
        self.entries.get(id).map(|entry| entry.handle.kind())
    }

    /// The descriptor registered for `id`.
    #[must_use]
    pub fn descriptor(&self, id: &CapabilityId) -> Option<&Descriptor> {
        self.entries.get(id).map(|entry| &entry.descriptor)
    }

    /// Registered modules, in registration order.
    #[must_use]
    pub fn modules(&self) -> &[CapabilityId] {
        &self.modules
    }

    /// Registered plugins, in registration order.
    #[must_use]
    pub fn plugins(&self) -> &[CapabilityId] {
        &self.plugins
    }

    /// The bootstrap module, if one was configured.
    #[must_use]
    pub fn bootstrap(&self) -> Option<&CapabilityId> {
        self.bootstrap.as_ref().map(|(id, _)| id)
    }

    /// The `(source, key)` notifications currently routed to `origin`.
    #[must_use]
    pub fn subscriptions(&self, origin: &CapabilityId) -> Vec<(CapabilityId, String)> {
        self.router.routes_for(origin)
    }

    /// The underlying broadcast router.
    #[must_use]
    pub fn router(&self) -> &BroadcastRouter {
        &self.router
    }

    fn entry(&self, id: &CapabilityId) -> ManagerResult<&RegistryEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| ManagerError::NotRegistered(id.clone()))
    }

    fn install_request(&self, origin: &CapabilityId, plugin: &dyn PluginCapability) {
        debug!(capability = %origin, "Installing request dispatcher");
        let this = Weak::clone(&self.this);
        let origin = origin.clone();
        plugin.request_slot().install(Arc::new(
            move |target: &CapabilityId, method: &str, value: Value| -> CapabilityResult<Value> {
                let Some(manager) = this.upgrade() else {
                    return Err(CapabilityError::Dispatch {
                        target: target.clone(),
                        method: method.to_string(),
                        message: "manager has been shut down".to_string(),
                    });
                };
                trace!(origin = %origin, target_capability = %target, method, "Plugin request");
                manager
                    .call(target, method, value)
                    .map_err(|e| e.into_dispatch_error(target, method))
            },
        ));
    }

    fn wire_notifications(&self, entry: &RegistryEntry, plugin: &dyn PluginCapability) {
        let origin = &entry.descriptor.id;
        for notification in &entry.descriptor.notifications {
            match plugin.notifs().get(&notification.source, &notification.key) {
                Some(callback) => {
                    self.router
                        .subscribe(origin, &notification.source, &notification.key, callback);
                },
                None => warn!(
                    capability = %origin,
                    source = %notification.source,
                    event = %notification.key,
                    "Declared notification has no handler; skipping"
                ),
            }
        }
    }

    fn on_bootstrap_signal(&self, signal: Signal, value: &Value) {
        let Some(name) = value.as_str() else {
            warn!(signal = ?signal, payload = %value, "Bootstrap signal payload is not a capability type");
            return;
        };
        let id = match CapabilityId::new(name) {
            Ok(id) => id,
            Err(e) => {
                warn!(signal = ?signal, error = %e, "Bootstrap signal named an invalid capability");
                return;
            },
        };

        let result = match signal {
            Signal::Activate => self.activate(&id),
            Signal::Deactivate => self.deactivate(&id),
        };
        if let Err(e) = result {
            warn!(capability = %id, signal = ?signal, error = %e, "Bootstrap-driven transition failed");
        }
    }
}

impl Drop for AppManager {
    fn drop(&mut self) {
        // Handles outlive the manager; leave nothing of ours behind in them.
        if let Some((id, subscriptions)) = &self.bootstrap
            && let Some(entry) = self.entries.get(id)
        {
            for subscription in subscriptions {
                entry.handle.events().unsubscribe(*subscription);
            }
        }
        for entry in self.entries.values() {
            release_events(entry);
            if let Handle::Plugin(plugin) = &entry.handle {
                plugin.request_slot().clear();
            }
        }
    }
}

impl std::fmt::Debug for AppManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppManager")
            .field("modules", &self.modules)
            .field("plugins", &self.plugins)
            .field("bootstrap", &self.bootstrap())
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

fn insert_entry(
    entries: &mut HashMap<CapabilityId, RegistryEntry>,
    entry: RegistryEntry,
) -> ManagerResult<()> {
    match entries.entry(entry.descriptor.id.clone()) {
        Entry::Occupied(existing) => Err(ManagerError::DuplicateCapability(existing.key().clone())),
        Entry::Vacant(slot) => {
            slot.insert(entry);
            Ok(())
        },
    }
}

fn check_bootstrap(
    entries: &HashMap<CapabilityId, RegistryEntry>,
    name: &str,
) -> ManagerResult<CapabilityId> {
    let id = CapabilityId::new(name).map_err(|e| {
        ManagerError::Configuration(format!("invalid bootstrap module name {name:?}: {e}"))
    })?;
    let entry = entries.get(&id).ok_or_else(|| {
        ManagerError::Configuration(format!("bootstrap module {id} is not registered"))
    })?;
    if entry.handle.kind() != CapabilityKind::Module {
        return Err(ManagerError::Configuration(format!(
            "bootstrap capability {id} is a plugin, not a module"
        )));
    }
    for event in [BOOTSTRAP_ACTIVATE_EVENT, BOOTSTRAP_DEACTIVATE_EVENT] {
        if !entry.descriptor.declares_event(event) {
            return Err(ManagerError::Configuration(format!(
                "bootstrap module {id} does not declare '{event}'"
            )));
        }
        if !entry.handle.events().emits(event) {
            return Err(ManagerError::Configuration(format!(
                "bootstrap module {id} does not emit '{event}'"
            )));
        }
    }
    Ok(id)
}

fn subscribe_bootstrap(entry: &RegistryEntry, manager: &Weak<AppManager>) -> Vec<SubscriptionId> {
    let emitter = entry.handle.events();
    let mut subscriptions = Vec::with_capacity(2);
    for (event, signal) in [
        (BOOTSTRAP_ACTIVATE_EVENT, Signal::Activate),
        (BOOTSTRAP_DEACTIVATE_EVENT, Signal::Deactivate),
    ] {
        let manager = Weak::clone(manager);
        let callback: EventCallback = Arc::new(move |value: &Value| {
            if let Some(manager) = manager.upgrade() {
                manager.on_bootstrap_signal(signal, value);
            }
        });
        match emitter.subscribe(event, callback) {
            Ok(subscription) => subscriptions.push(subscription),
            Err(e) => warn!(
                capability = %entry.descriptor.id,
                event,
                error = %e,
                "Failed to subscribe to bootstrap signal"
            ),
        }
    }
    debug!(capability = %entry.descriptor.id, "Subscribed to bootstrap signals");
    subscriptions
}

/// Wire declared events into the router and declared methods into the
/// namespace.
fn wire_api(entry: &RegistryEntry, router: &Arc<BroadcastRouter>) {
    let id = &entry.descriptor.id;
    let emitter = entry.handle.events();

    for event in &entry.descriptor.events {
        if !emitter.emits(event) {
            warn!(capability = %id, event = %event, "Declared event not produced by handle; skipping");
            continue;
        }
        let router = Arc::downgrade(router);
        let source = id.clone();
        let key = event.clone();
        let forward: EventCallback = Arc::new(move |value: &Value| {
            if let Some(router) = router.upgrade() {
                router.broadcast(&source, &key, value);
            }
        });
        match emitter.subscribe(event, forward) {
            Ok(subscription) => entry.push_subscription(subscription),
            Err(e) => warn!(capability = %id, event = %event, error = %e, "Failed to wire event"),
        }
    }

    let mut table = MethodTable::default();
    for method in &entry.descriptor.methods {
        if entry.handle.provides(method) {
            table.insert(method, entry.handle.bind(method));
        } else {
            warn!(capability = %id, method = %method, "Declared method not provided by handle; skipping");
        }
    }
    debug!(
        capability = %id,
        methods = ?table.names(),
        events = entry.descriptor.events.len(),
        "Wired capability"
    );
    entry.replace_api(table);
}

fn release_events(entry: &RegistryEntry) {
    let emitter = entry.handle.events();
    for subscription in entry.take_subscriptions() {
        emitter.unsubscribe(subscription);
    }
}

/// Builder for [`AppManager`].
#[derive(Default)]
pub struct AppManagerBuilder {
    modules: Vec<ModuleRegistration>,
    plugins: Vec<PluginRegistration>,
    bootstrap: Option<String>,
}

impl AppManagerBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module.
    #[must_use]
    pub fn module(mut self, descriptor: Descriptor, handle: Arc<dyn Capability>) -> Self {
        self.modules.push((descriptor, handle));
        self
    }

    /// Register a plugin.
    #[must_use]
    pub fn plugin(mut self, descriptor: Descriptor, handle: Arc<dyn PluginCapability>) -> Self {
        self.plugins.push((descriptor, handle));
        self
    }

    /// Name the module whose `activate`/`deactivate` events drive plugin
    /// transitions.
    #[must_use]
    pub fn bootstrap(mut self, name: impl Into<String>) -> Self {
        self.bootstrap = Some(name.into());
        self
    }

    /// Build the manager.
    ///
    /// # Errors
    ///
    /// See [`AppManager::new`].
    pub fn build(self) -> ManagerResult<Arc<AppManager>> {
        AppManager::new(self.modules, self.plugins, self.bootstrap.as_deref())
    }
}

impl std::fmt::Debug for AppManagerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppManagerBuilder")
            .field("modules", &self.modules.iter().map(|(d, _)| d.id.as_str()).collect::<Vec<_>>())
            .field("plugins", &self.plugins.iter().map(|(d, _)| d.id.as_str()).collect::<Vec<_>>())
            .field("bootstrap", &self.bootstrap)
            .finish()
    }
}
