//! Capability error types.

use std::path::PathBuf;

use crate::id::CapabilityId;

/// Errors raised by capability handles and descriptor handling.
#[derive(Debug, thiserror::Error)]
pub enum CapabilityError {
    /// An `activate()` or `deactivate()` hook failed.
    #[error("hook failed for {capability}: {message}")]
    Hook {
        /// The capability whose hook failed.
        capability: CapabilityId,
        /// Failure reason.
        message: String,
    },

    /// An exposed method failed while handling a call.
    #[error("method {method} failed: {message}")]
    Method {
        /// Name of the failing method.
        method: String,
        /// Failure reason.
        message: String,
    },

    /// A request issued through a plugin's request slot could not be dispatched.
    #[error("cannot dispatch {target}.{method}: {message}")]
    Dispatch {
        /// Target capability.
        target: CapabilityId,
        /// Target method.
        method: String,
        /// Why the dispatch failed.
        message: String,
    },

    /// The capability ID is invalid.
    #[error("invalid capability id: {0}")]
    InvalidId(String),

    /// A descriptor is internally inconsistent.
    #[error("invalid descriptor for {capability}: {message}")]
    InvalidDescriptor {
        /// The capability the descriptor describes.
        capability: CapabilityId,
        /// What is wrong with it.
        message: String,
    },

    /// Failed to parse a capability manifest file.
    #[error("manifest parse error in {path}: {message}")]
    ManifestParseError {
        /// Path to the manifest file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CapabilityError {
    /// Shorthand for a [`CapabilityError::Hook`] failure.
    pub fn hook(capability: &CapabilityId, message: impl Into<String>) -> Self {
        Self::Hook {
            capability: capability.clone(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`CapabilityError::Method`] failure.
    pub fn method(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Method {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;
