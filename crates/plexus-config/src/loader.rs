//! Layered loading.
//!
//! Layers merge as TOML trees, lowest first: the embedded `defaults.toml`,
//! `~/.plexus/config.toml`, an explicitly named file, then `PLEXUS_*`
//! variables. The merged tree is deserialized once and validated.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Config files larger than this are refused before parsing.
const MAX_FILE_BYTES: u64 = 1024 * 1024;

/// A loaded configuration together with where each value came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Dotted field path to the layer that last set it.
    pub field_sources: FieldSources,
    /// Config files that were found and merged, in merge order.
    pub loaded_files: Vec<PathBuf>,
}

impl ResolvedConfig {
    /// The layer that set `field` (e.g. `"logging.level"`).
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<ConfigLayer> {
        self.field_sources.get(field).copied()
    }
}

/// The merged TOML tree plus its provenance, built one layer at a time.
struct Layers {
    tree: toml::Value,
    sources: FieldSources,
    files: Vec<PathBuf>,
}

impl Layers {
    fn from_defaults() -> ConfigResult<Self> {
        let tree = parse_toml("<embedded defaults>", DEFAULTS_TOML)?;
        let mut sources = FieldSources::new();
        record_leaves(&tree, "", ConfigLayer::Defaults, &mut sources);
        Ok(Self {
            tree,
            sources,
            files: Vec::new(),
        })
    }

    fn merge_file(&mut self, path: &Path, overlay: &toml::Value, layer: ConfigLayer) {
        deep_merge_tracking(&mut self.tree, overlay, "", layer, &mut self.sources);
        info!(path = %path.display(), layer = %layer, "Merged config file");
        self.files.push(path.to_path_buf());
    }

    fn finish(self) -> ConfigResult<ResolvedConfig> {
        let config = into_config("<merged config>", self.tree)?;
        validate::validate(&config)?;
        Ok(ResolvedConfig {
            config,
            field_sources: self.sources,
            loaded_files: self.files,
        })
    }
}

/// Load configuration with layered precedence.
///
/// `explicit` is a config file named by the caller (e.g. a `--config`
/// flag); unlike the user file it must exist. `plexus_home_override`
/// replaces the `~/.plexus` directory.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is unreadable or malformed,
/// or if the merged configuration fails validation.
pub fn load(explicit: Option<&Path>, plexus_home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_with_env(explicit, plexus_home_override, &collect_env_vars())
}

pub(crate) fn load_with_env(
    explicit: Option<&Path>,
    plexus_home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut layers = Layers::from_defaults()?;

    let home = match plexus_home_override {
        Some(dir) => dir.to_path_buf(),
        None => home_directory()?.join(".plexus"),
    };
    let user_path = home.join("config.toml");
    match read_file(&user_path)? {
        Some(overlay) => layers.merge_file(&user_path, &overlay, ConfigLayer::User),
        None => debug!(path = %user_path.display(), "No user config"),
    }

    if let Some(path) = explicit {
        let overlay = read_file(path)?.ok_or_else(|| ConfigError::ReadError {
            path: path.display().to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "explicit config file does not exist"),
        })?;
        layers.merge_file(path, &overlay, ConfigLayer::File);
    }

    let overridden = apply_env_overrides(&mut layers.tree, &mut layers.sources, env_vars);
    if overridden > 0 {
        debug!(count = overridden, "Applied environment overrides");
    }

    layers.finish()
}

/// Load a config from a single file (no layering, no environment).
///
/// Fields the file leaves out take their default values.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, malformed,
/// or fails validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let display = path.display().to_string();
    let tree = read_file(path)?.ok_or_else(|| ConfigError::ReadError {
        path: display.clone(),
        source: io::Error::new(io::ErrorKind::NotFound, "config file does not exist"),
    })?;
    let config = into_config(&display, tree)?;
    validate::validate(&config)?;
    Ok(config)
}

/// Read and parse `path`. A missing file is `Ok(None)`.
fn read_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let read_error = |source| ConfigError::ReadError {
        path: path.display().to_string(),
        source,
    };

    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(read_error(e)),
    };
    if size > MAX_FILE_BYTES {
        return Err(ConfigError::invalid(
            path.display().to_string(),
            format!("file is {size} bytes; the limit is {MAX_FILE_BYTES}"),
        ));
    }

    let text = std::fs::read_to_string(path).map_err(read_error)?;
    parse_toml(&path.display().to_string(), &text).map(Some)
}

fn parse_toml(origin: &str, text: &str) -> ConfigResult<toml::Value> {
    toml::from_str(text).map_err(|source| ConfigError::ParseError {
        path: origin.to_owned(),
        source,
    })
}

fn into_config(origin: &str, tree: toml::Value) -> ConfigResult<Config> {
    tree.try_into().map_err(|source| ConfigError::ParseError {
        path: origin.to_owned(),
        source,
    })
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
