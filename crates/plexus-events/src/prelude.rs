//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plexus_events::prelude::*;` to import all essential types.

// Emitters
pub use crate::{EventCallback, EventEmitter, EventHub, SubscriptionId};

// Routing
pub use crate::BroadcastRouter;

// Errors
pub use crate::{EventError, EventResult};
