//! Plexus Core - Shared types for the Plexus capability manager.
//!
//! This crate provides:
//! - [`CapabilityId`]: typed identifier used as registry key and method namespace
//! - [`Descriptor`]: static metadata describing a capability's methods, events,
//!   and notification subscriptions
//! - [`CapabilityManifest`]: on-disk TOML form of a descriptor, tagged with
//!   its [`CapabilityKind`]
//! - [`discover_descriptors`]: directory scan for capability manifests
//! - [`CapabilityError`]: errors raised by capability handles
//!
//! Payloads crossing capability boundaries are plain JSON values
//! ([`Value`]), so in-process and remote capabilities share one calling
//! convention.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod id;
pub mod manifest;
pub mod prelude;

pub use descriptor::{Descriptor, Notification};
pub use discovery::{MANIFEST_EXTENSION, discover_descriptors, load_descriptor};
pub use error::{CapabilityError, CapabilityResult};
pub use id::CapabilityId;
pub use manifest::{CapabilityKind, CapabilityManifest};

/// Payload carried by method calls and events.
pub use serde_json::Value;
