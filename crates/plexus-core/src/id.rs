//! Capability identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CapabilityError, CapabilityResult};

/// Unique, stable capability identifier.
///
/// The identifier doubles as the registry key and as the namespace under
/// which the capability's methods are exposed. IDs are strings like `"fs"`,
/// `"theme"` or `"solidity-compiler"`: non-empty, made of ASCII
/// alphanumerics, `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CapabilityId(String);

/// Deserialize with validation so manifests cannot smuggle in malformed IDs.
impl<'de> Deserialize<'de> for CapabilityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl CapabilityId {
    /// Create a new `CapabilityId`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidId`] if the ID is empty or contains
    /// invalid characters.
    pub fn new(id: impl Into<String>) -> CapabilityResult<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Create a `CapabilityId` without validation (for tests and internal use).
    #[must_use]
    pub fn from_static(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string is a valid capability ID without constructing one.
    #[must_use]
    pub fn is_valid_id(id: &str) -> bool {
        Self::validate(id).is_ok()
    }

    fn validate(id: &str) -> CapabilityResult<()> {
        if id.is_empty() {
            return Err(CapabilityError::InvalidId(
                "capability id must not be empty".into(),
            ));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CapabilityError::InvalidId(format!(
                "capability id must contain only ASCII alphanumeric characters, hyphens and underscores, got: {id}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CapabilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CapabilityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for CapabilityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
