//! Plugin request slot.

use std::sync::{Arc, PoisonError, RwLock};

use plexus_core::{CapabilityError, CapabilityId, CapabilityResult, Value};
use tracing::trace;

/// Dispatcher installed into a plugin's request slot.
///
/// Arguments are the target capability, the method name and the payload.
pub type RequestFn = Arc<dyn Fn(&CapabilityId, &str, Value) -> CapabilityResult<Value> + Send + Sync>;

/// The one place a plugin reaches other capabilities from.
///
/// Holds a dispatcher only while the plugin is active.
#[derive(Default)]
pub struct RequestSlot {
    dispatcher: RwLock<Option<RequestFn>>,
}

impl RequestSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `method` on `target` through the installed dispatcher.
    ///
    /// The slot lock is released before the dispatcher runs, so the target
    /// may in turn issue requests of its own.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::Dispatch`] if the slot is empty or the
    /// target method is not live, or the target method's own error.
    pub fn request(&self, target: &CapabilityId, method: &str, value: Value) -> CapabilityResult<Value> {
        let dispatcher = self
            .dispatcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| CapabilityError::Dispatch {
                target: target.clone(),
                method: method.to_string(),
                message: "plugin is not active".to_string(),
            })?;

        trace!(target_capability = %target, method, "Dispatching request");
        dispatcher(target, method, value)
    }

    /// Whether a dispatcher is installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.dispatcher
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn install(&self, dispatcher: RequestFn) {
        *self.dispatcher.write().unwrap_or_else(PoisonError::into_inner) = Some(dispatcher);
    }

    /// Returns `true` if a dispatcher was removed.
    pub(crate) fn clear(&self) -> bool {
        let removed = self
            .dispatcher
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        removed.is_some()
    }
}

impl std::fmt::Debug for RequestSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSlot")
            .field("installed", &self.is_installed())
            .finish()
    }
}
