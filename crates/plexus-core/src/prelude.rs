//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plexus_core::prelude::*;` to import all essential types.

// Identity
pub use crate::CapabilityId;

// Descriptors
pub use crate::{CapabilityKind, CapabilityManifest, Descriptor, Notification};

// Errors
pub use crate::{CapabilityError, CapabilityResult};

// Payloads
pub use crate::Value;
