//! Capability manifest types.
//!
//! A manifest is the TOML form of a [`Descriptor`], tagged with whether the
//! capability is an internal module or an external plugin:
//!
//! ```toml
//! kind = "plugin"
//! type = "compiler"
//! methods = ["compile", "getCompilationResult"]
//! events = ["compilationFinished"]
//!
//! [[notification]]
//! type = "fs"
//! key = "currentFileChanged"
//! ```

use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptor;
use crate::error::{CapabilityError, CapabilityResult};

/// Whether a capability is provided by the host or loaded from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityKind {
    /// Internally provided, always on from the manager's perspective.
    Module,
    /// Externally provided, starts dormant.
    Plugin,
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => f.write_str("module"),
            Self::Plugin => f.write_str("plugin"),
        }
    }
}

/// A descriptor loaded from a manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityManifest {
    /// Module or plugin.
    pub kind: CapabilityKind,
    /// The descriptor itself.
    #[serde(flatten)]
    pub descriptor: Descriptor,
}

impl CapabilityManifest {
    /// Parse and validate a manifest from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::ManifestParseError`] on malformed TOML and
    /// [`CapabilityError::InvalidDescriptor`] if the descriptor fails
    /// validation.
    pub fn from_toml_str(content: &str) -> CapabilityResult<Self> {
        let manifest: Self =
            toml::from_str(content).map_err(|e| CapabilityError::ManifestParseError {
                path: "<inline>".into(),
                message: e.to_string(),
            })?;
        manifest.descriptor.validate()?;
        Ok(manifest)
    }

    /// Render the manifest back to TOML.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::ManifestParseError`] if serialization fails.
    pub fn to_toml_string(&self) -> CapabilityResult<String> {
        toml::to_string(self).map_err(|e| CapabilityError::ManifestParseError {
            path: "<inline>".into(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::CapabilityId;

    #[test]
    fn test_parse_plugin_manifest() {
        let manifest = CapabilityManifest::from_toml_str(
            r#"
kind = "plugin"
type = "compiler"
methods = ["compile"]
events = ["compilationFinished"]

[[notification]]
type = "fs"
key = "currentFileChanged"

[[notification]]
type = "theme"
key = "themeChanged"
"#,
        )
        .unwrap();

        assert_eq!(manifest.kind, CapabilityKind::Plugin);
        assert_eq!(manifest.descriptor.id, CapabilityId::from_static("compiler"));
        assert_eq!(manifest.descriptor.notifications.len(), 2);
        assert_eq!(manifest.descriptor.notifications[1].key, "themeChanged");
    }

    #[test]
    fn test_parse_module_manifest_defaults() {
        let manifest = CapabilityManifest::from_toml_str(
            r#"
kind = "module"
type = "theme"
"#,
        )
        .unwrap();

        assert_eq!(manifest.kind, CapabilityKind::Module);
        assert!(manifest.descriptor.methods.is_empty());
        assert!(manifest.descriptor.events.is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        let result = CapabilityManifest::from_toml_str(
            r#"
kind = "service"
type = "theme"
"#,
        );
        assert!(matches!(
            result,
            Err(CapabilityError::ManifestParseError { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_descriptor() {
        let result = CapabilityManifest::from_toml_str(
            r#"
kind = "module"
type = "fs"
methods = ["getFile", "getFile"]
"#,
        );
        assert!(matches!(
            result,
            Err(CapabilityError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn test_toml_round_trip_keeps_notifications() {
        let manifest = CapabilityManifest {
            kind: CapabilityKind::Plugin,
            descriptor: Descriptor::new(CapabilityId::from_static("linter"))
                .with_methods(["lint"])
                .with_notification(CapabilityId::from_static("fs"), "currentFileChanged"),
        };
        let text = manifest.to_toml_string().unwrap();
        assert!(text.contains("[[notification]]"));
        assert_eq!(CapabilityManifest::from_toml_str(&text).unwrap(), manifest);
    }
}
