//! Test fixtures for common types.

use std::path::{Path, PathBuf};

use plexus_core::{CapabilityId, Descriptor};

/// Create a capability ID without validation.
#[must_use]
pub fn test_id(id: &str) -> CapabilityId {
    CapabilityId::from_static(id)
}

/// A filesystem-like module: `read`/`write` methods, `changed` event.
#[must_use]
pub fn test_module_descriptor() -> Descriptor {
    Descriptor::new(test_id("fs"))
        .with_methods(["read", "write"])
        .with_events(["changed"])
}

/// An editor-like plugin: `open` method, subscribed to `fs.changed`.
#[must_use]
pub fn test_plugin_descriptor() -> Descriptor {
    Descriptor::new(test_id("editor"))
        .with_methods(["open"])
        .with_notification(test_id("fs"), "changed")
}

/// A bootstrap module emitting `activate` and `deactivate`.
#[must_use]
pub fn test_bootstrap_descriptor() -> Descriptor {
    Descriptor::new(test_id("shell")).with_events(["activate", "deactivate"])
}

/// Manifest text for [`test_plugin_descriptor`].
pub const TEST_PLUGIN_MANIFEST: &str = r#"
kind = "plugin"
type = "editor"
methods = ["open"]
events = []

[[notification]]
type = "fs"
key = "changed"
"#;

/// Manifest text for [`test_module_descriptor`].
pub const TEST_MODULE_MANIFEST: &str = r#"
kind = "module"
type = "fs"
methods = ["read", "write"]
events = ["changed"]
"#;

/// Write a manifest named `{name}.toml` into `dir`.
///
/// # Panics
///
/// Panics if the file cannot be written.
pub fn write_manifest(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(format!("{name}.toml"));
    #[allow(clippy::expect_used)]
    std::fs::write(&path, content).expect("failed to write test manifest");
    path
}
