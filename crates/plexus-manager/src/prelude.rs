//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plexus_manager::prelude::*;` to import all essential types.

// Manager
pub use crate::{AppManager, AppManagerBuilder, CapabilityStatus};

// Handles
pub use crate::{Capability, MethodFn, Notifications, PluginCapability, RequestSlot};

// Errors
pub use crate::{ManagerError, ManagerResult};
