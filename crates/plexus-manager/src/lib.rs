//! Plexus Manager - Registry and lifecycle control for capabilities.
//!
//! This crate provides:
//! - [`Capability`] / [`PluginCapability`]: the handle contract for modules
//!   and plugins
//! - [`RequestSlot`]: the dispatcher a plugin uses to reach other capabilities
//! - [`Notifications`]: a plugin's handlers for events on other capabilities
//! - [`AppManager`]: the registry, the activation state machine and the
//!   exposed-API namespace
//!
//! # Lifecycle
//!
//! Modules are wired and active from construction. Plugins start
//! [`Registered`](CapabilityStatus::Registered) and become
//! [`Active`](CapabilityStatus::Active) on [`AppManager::activate`]:
//!
//! 1. declared events are forwarded into the broadcast router
//! 2. declared methods are bound into the namespace
//! 3. the request slot receives a dispatcher over that namespace
//! 4. declared notifications are routed to the plugin's handlers
//! 5. the handle's `activate()` hook runs
//!
//! [`AppManager::deactivate`] undoes the wiring and then runs `deactivate()`.
//!
//! # Example
//!
//! ```rust,ignore
//! use plexus_core::{CapabilityId, Descriptor, Value};
//! use plexus_manager::AppManager;
//!
//! let manager = AppManager::builder()
//!     .module(fs_descriptor, fs_module)
//!     .plugin(editor_descriptor, editor_plugin)
//!     .bootstrap("shell")
//!     .build()?;
//!
//! manager.activate(&CapabilityId::from_static("editor"))?;
//! let text = manager.call(&CapabilityId::from_static("fs"), "read", Value::from("README.md"))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod handle;
mod manager;
mod namespace;
mod registry;
mod request;

pub use error::{ManagerError, ManagerResult};
pub use handle::{Capability, MethodFn, Notifications, PluginCapability};
pub use manager::{
    AppManager, AppManagerBuilder, BOOTSTRAP_ACTIVATE_EVENT, BOOTSTRAP_DEACTIVATE_EVENT,
    ModuleRegistration, PluginRegistration,
};
pub use registry::CapabilityStatus;
pub use request::{RequestFn, RequestSlot};
