//! Plexus Events - Event plumbing for the Plexus capability manager.
//!
//! This crate provides:
//! - [`EventEmitter`]: the typed `subscribe`/`unsubscribe` contract every
//!   capability handle implements for the events it declares
//! - [`EventHub`]: the stock emitter, a per-event list of callbacks
//! - [`BroadcastRouter`]: the subscriber-indexed routing table that fans one
//!   emitted event out to every plugin that asked for it
//!
//! # Architecture
//!
//! Producers and consumers never see each other. A producer emits on its
//! own [`EventHub`]; the manager subscribes to that hub while the producer is
//! active and forwards each emission to [`BroadcastRouter::broadcast`]. The
//! router holds, per subscriber origin, the notification callbacks that
//! origin declared, and invokes every match exactly once.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use plexus_core::{CapabilityId, Value};
//! use plexus_events::BroadcastRouter;
//!
//! let router = BroadcastRouter::new();
//! let editor = CapabilityId::from_static("editor");
//! let fs = CapabilityId::from_static("fs");
//!
//! router.subscribe(&editor, &fs, "currentFileChanged", Arc::new(|value: &Value| {
//!     println!("file changed: {value}");
//! }));
//!
//! let delivered = router.broadcast(&fs, "currentFileChanged", &Value::from("README.md"));
//! assert_eq!(delivered, 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod emitter;
mod error;
mod hub;
mod router;

pub use emitter::{EventCallback, EventEmitter, SubscriptionId};
pub use error::{EventError, EventResult};
pub use hub::EventHub;
pub use router::BroadcastRouter;
