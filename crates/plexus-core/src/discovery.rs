//! Capability manifest discovery.
//!
//! Scans a directory for `*.toml` manifests. Errors in individual manifests
//! are logged as warnings and do not prevent other manifests from loading.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{CapabilityError, CapabilityResult};
use crate::manifest::CapabilityManifest;

/// File extension recognised as a capability manifest.
pub const MANIFEST_EXTENSION: &str = "toml";

/// Manifests larger than this are rejected before reading.
const MAX_MANIFEST_SIZE: u64 = 64 * 1024;

/// Load every capability manifest in `dir`.
///
/// Returns `(manifest, path)` pairs sorted by path so registration order is
/// stable across runs. Subdirectories are not traversed.
///
/// # Errors
///
/// Returns [`CapabilityError::Io`] if the directory itself cannot be read.
pub fn discover_descriptors(dir: &Path) -> CapabilityResult<Vec<(CapabilityManifest, PathBuf)>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == MANIFEST_EXTENSION)
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut manifests = Vec::with_capacity(paths.len());
    for path in paths {
        match load_descriptor(&path) {
            Ok(manifest) => {
                debug!(
                    path = %path.display(),
                    capability = %manifest.descriptor.id,
                    kind = %manifest.kind,
                    "Loaded capability manifest"
                );
                manifests.push((manifest, path));
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping invalid capability manifest");
            },
        }
    }

    info!(dir = %dir.display(), count = manifests.len(), "Discovered capability manifests");
    Ok(manifests)
}

/// Load a single capability manifest.
///
/// # Errors
///
/// Returns [`CapabilityError::Io`] if the file cannot be read,
/// [`CapabilityError::ManifestParseError`] if it is too large or malformed,
/// and [`CapabilityError::InvalidDescriptor`] if validation fails.
pub fn load_descriptor(path: &Path) -> CapabilityResult<CapabilityManifest> {
    let metadata = std::fs::metadata(path)?;
    if metadata.len() > MAX_MANIFEST_SIZE {
        return Err(CapabilityError::ManifestParseError {
            path: path.to_path_buf(),
            message: format!(
                "manifest is {} bytes, exceeding the {MAX_MANIFEST_SIZE} byte limit",
                metadata.len()
            ),
        });
    }

    let content = std::fs::read_to_string(path)?;
    CapabilityManifest::from_toml_str(&content).map_err(|e| match e {
        CapabilityError::ManifestParseError { message, .. } => {
            CapabilityError::ManifestParseError {
                path: path.to_path_buf(),
                message,
            }
        },
        other => other,
    })
}
