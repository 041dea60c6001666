//! Registry entries.
//!
//! The set of entries is fixed at construction; only the per-entry state
//! behind the locks changes afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use plexus_core::{CapabilityKind, CapabilityResult, Descriptor};
use plexus_events::{EventEmitter, SubscriptionId};

use crate::handle::{Capability, MethodFn, PluginCapability, bind};
use crate::namespace::MethodTable;

/// Lifecycle state of a registered capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityStatus {
    /// Known to the manager, nothing wired.
    Registered,
    /// Methods, events and (for plugins) request and notifications are wired.
    Active,
}

impl std::fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registered => write!(f, "registered"),
            Self::Active => write!(f, "active"),
        }
    }
}

pub(crate) enum Handle {
    Module(Arc<dyn Capability>),
    Plugin(Arc<dyn PluginCapability>),
}

impl Handle {
    pub(crate) fn kind(&self) -> CapabilityKind {
        match self {
            Self::Module(_) => CapabilityKind::Module,
            Self::Plugin(_) => CapabilityKind::Plugin,
        }
    }

    pub(crate) fn provides(&self, method: &str) -> bool {
        match self {
            Self::Module(m) => m.provides(method),
            Self::Plugin(p) => p.provides(method),
        }
    }

    pub(crate) fn bind(&self, method: &str) -> MethodFn {
        match self {
            Self::Module(m) => bind(m, method),
            Self::Plugin(p) => bind(p, method),
        }
    }

    pub(crate) fn events(&self) -> &dyn EventEmitter {
        match self {
            Self::Module(m) => m.events(),
            Self::Plugin(p) => p.events(),
        }
    }

    pub(crate) fn activate(&self) -> CapabilityResult<()> {
        match self {
            Self::Module(m) => m.activate(),
            Self::Plugin(p) => p.activate(),
        }
    }

    pub(crate) fn deactivate(&self) -> CapabilityResult<()> {
        match self {
            Self::Module(m) => m.deactivate(),
            Self::Plugin(p) => p.deactivate(),
        }
    }
}

pub(crate) struct RegistryEntry {
    pub(crate) descriptor: Descriptor,
    pub(crate) handle: Handle,
    status: RwLock<CapabilityStatus>,
    api: RwLock<MethodTable>,
    emitter_subscriptions: Mutex<Vec<SubscriptionId>>,
    transition: Mutex<()>,
    /// The hook of the last transition failed and has not yet succeeded.
    hook_pending: AtomicBool,
}

impl RegistryEntry {
    pub(crate) fn new(descriptor: Descriptor, handle: Handle) -> Self {
        Self {
            descriptor,
            handle,
            status: RwLock::new(CapabilityStatus::Registered),
            api: RwLock::new(MethodTable::default()),
            emitter_subscriptions: Mutex::new(Vec::new()),
            transition: Mutex::new(()),
            hook_pending: AtomicBool::new(false),
        }
    }

    pub(crate) fn status(&self) -> CapabilityStatus {
        *self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_status(&self, status: CapabilityStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// Held for the whole of an activate or deactivate, hook included.
    pub(crate) fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transition.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn hook_pending(&self) -> bool {
        self.hook_pending.load(Ordering::Acquire)
    }

    /// Run the hook for the current status and record whether it finished.
    pub(crate) fn run_hook(&self) -> CapabilityResult<()> {
        let result = match self.status() {
            CapabilityStatus::Active => self.handle.activate(),
            CapabilityStatus::Registered => self.handle.deactivate(),
        };
        self.hook_pending.store(result.is_err(), Ordering::Release);
        result
    }

    pub(crate) fn method(&self, name: &str) -> Option<MethodFn> {
        self.api.read().unwrap_or_else(PoisonError::into_inner).get(name)
    }

    pub(crate) fn method_names(&self) -> Vec<String> {
        self.api.read().unwrap_or_else(PoisonError::into_inner).names()
    }

    pub(crate) fn replace_api(&self, table: MethodTable) {
        // Old bound methods drop after the lock is released.
        let previous = std::mem::replace(
            &mut *self.api.write().unwrap_or_else(PoisonError::into_inner),
            table,
        );
        drop(previous);
    }

    pub(crate) fn push_subscription(&self, id: SubscriptionId) {
        self.emitter_subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(id);
    }

    pub(crate) fn take_subscriptions(&self) -> Vec<SubscriptionId> {
        std::mem::take(
            &mut *self
                .emitter_subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }
}
