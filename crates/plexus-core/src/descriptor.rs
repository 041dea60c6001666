//! Capability descriptors.
//!
//! A descriptor is the static half of a capability: which methods it promises
//! to expose once active, which events it emits, and (for plugins) which
//! events on other capabilities it wants delivered. Descriptors are immutable
//! once handed to the manager.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{CapabilityError, CapabilityResult};
use crate::id::CapabilityId;

/// A `(type, key)` pair naming an event on another capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Notification {
    /// The capability that emits the event.
    #[serde(rename = "type")]
    pub source: CapabilityId,
    /// The event name on that capability.
    pub key: String,
}

impl Notification {
    /// Create a notification subscription entry.
    pub fn new(source: CapabilityId, key: impl Into<String>) -> Self {
        Self {
            source,
            key: key.into(),
        }
    }
}

/// Static metadata describing a module or plugin.
///
/// `notifications` is only honoured for plugins; modules are never
/// notification targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Registry key and method namespace.
    #[serde(rename = "type")]
    pub id: CapabilityId,
    /// Methods exposed while active, in declaration order.
    #[serde(default)]
    pub methods: Vec<String>,
    /// Events emitted while active.
    #[serde(default)]
    pub events: Vec<String>,
    /// Events on other capabilities this capability wants delivered.
    #[serde(default, rename = "notification", skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
}

impl Descriptor {
    /// Create an empty descriptor for the given capability.
    #[must_use]
    pub fn new(id: CapabilityId) -> Self {
        Self {
            id,
            methods: Vec::new(),
            events: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Declare exposed methods. Names already declared are ignored.
    #[must_use]
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for method in methods {
            push_unique(&mut self.methods, method.into());
        }
        self
    }

    /// Declare emitted events. Names already declared are ignored.
    #[must_use]
    pub fn with_events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for event in events {
            push_unique(&mut self.events, event.into());
        }
        self
    }

    /// Subscribe to `key` events emitted by `source`.
    #[must_use]
    pub fn with_notification(mut self, source: CapabilityId, key: impl Into<String>) -> Self {
        let notification = Notification::new(source, key);
        if !self.notifications.contains(&notification) {
            self.notifications.push(notification);
        }
        self
    }

    /// Merge a base profile's methods and events into this descriptor.
    ///
    /// Used for API families: a concrete file-system module extends the
    /// generic file-system profile and inherits its method list. Existing
    /// entries keep their position; base entries are appended in order.
    /// The base's notifications and identifier are not inherited.
    #[must_use]
    pub fn extend(mut self, base: &Descriptor) -> Self {
        for method in &base.methods {
            push_unique(&mut self.methods, method.clone());
        }
        for event in &base.events {
            push_unique(&mut self.events, event.clone());
        }
        self
    }

    /// Whether this descriptor declares the given method.
    #[must_use]
    pub fn declares_method(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m == method)
    }

    /// Whether this descriptor declares the given event.
    #[must_use]
    pub fn declares_event(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }

    /// Check that the descriptor is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidDescriptor`] for empty or duplicate
    /// method/event names, duplicate notifications, or a notification on the
    /// capability itself.
    pub fn validate(&self) -> CapabilityResult<()> {
        self.check_names("method", &self.methods)?;
        self.check_names("event", &self.events)?;

        let mut seen = HashSet::new();
        for notification in &self.notifications {
            if notification.key.is_empty() {
                return Err(self.invalid(format!(
                    "notification on {} has an empty key",
                    notification.source
                )));
            }
            if notification.source == self.id {
                return Err(self.invalid(format!(
                    "cannot subscribe to its own event {}",
                    notification.key
                )));
            }
            if !seen.insert(notification) {
                return Err(self.invalid(format!(
                    "duplicate notification {}.{}",
                    notification.source, notification.key
                )));
            }
        }
        Ok(())
    }

    fn check_names(&self, what: &str, names: &[String]) -> CapabilityResult<()> {
        let mut seen = HashSet::new();
        for name in names {
            if name.is_empty() {
                return Err(self.invalid(format!("empty {what} name")));
            }
            if !seen.insert(name.as_str()) {
                return Err(self.invalid(format!("duplicate {what} {name}")));
            }
        }
        Ok(())
    }

    fn invalid(&self, message: String) -> CapabilityError {
        CapabilityError::InvalidDescriptor {
            capability: self.id.clone(),
            message,
        }
    }
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}
