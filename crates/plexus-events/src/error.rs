//! Event error types.

use thiserror::Error;

/// Errors that can occur with event operations.
#[derive(Debug, Error)]
pub enum EventError {
    /// The emitter does not produce the requested event.
    #[error("unknown event: {event}")]
    UnknownEvent {
        /// The event name that was asked for.
        event: String,
    },
}

/// Result type for event operations.
pub type EventResult<T> = Result<T, EventError>;
