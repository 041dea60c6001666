//! Plexus Test - Shared test utilities for the Plexus capability manager.
//!
//! This crate provides recording mock handles and descriptor fixtures that
//! can be used across Plexus crates as a dev-dependency.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use plexus_manager::AppManager;
//! use plexus_test::{MockModule, MockPlugin, test_id};
//!
//! let fs = Arc::new(MockModule::new("fs").with_events(["changed"]));
//! let editor = Arc::new(MockPlugin::new("editor").with_notification("fs", "changed"));
//!
//! let manager = AppManager::builder()
//!     .module(fs.descriptor(), fs.clone())
//!     .plugin(editor.descriptor(), editor.clone())
//!     .build()
//!     .unwrap();
//!
//! manager.activate(&test_id("editor")).unwrap();
//! fs.emit("changed", serde_json::json!(42));
//! assert_eq!(editor.received().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
