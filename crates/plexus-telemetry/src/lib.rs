//! Plexus Telemetry - Logging setup for the Plexus capability manager.
//!
//! The manager crates only emit `tracing` events; this crate decides where
//! they go. Call [`setup_logging`] once at startup.
//!
//! # Example
//!
//! ```rust,no_run
//! use plexus_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), plexus_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("plexus_manager=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("capability manager starting");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
