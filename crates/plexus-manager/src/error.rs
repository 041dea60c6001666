//! Manager error types.

use plexus_core::{CapabilityError, CapabilityId};

/// Errors from manager operations.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// No module or plugin is registered under this type.
    #[error("capability {0} is not registered")]
    NotRegistered(CapabilityId),

    /// The manager was configured inconsistently (e.g. a missing bootstrap module).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two registrations share the same type.
    #[error("capability registered twice: {0}")]
    DuplicateCapability(CapabilityId),

    /// The method is not part of the capability's live namespace.
    #[error("method not found: {capability}.{method}")]
    MethodNotFound {
        /// Target capability.
        capability: CapabilityId,
        /// Missing method.
        method: String,
    },

    /// Error raised by a capability handle, propagated unchanged.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

impl ManagerError {
    /// Convert into the error a plugin sees from its request slot.
    ///
    /// Handle errors pass through untouched; manager-side failures become
    /// [`CapabilityError::Dispatch`].
    pub(crate) fn into_dispatch_error(self, target: &CapabilityId, method: &str) -> CapabilityError {
        match self {
            Self::Capability(e) => e,
            other => CapabilityError::Dispatch {
                target: target.clone(),
                method: method.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Result type for manager operations.
pub type ManagerResult<T> = Result<T, ManagerError>;
