//! Configuration error types.

use std::io;

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("cannot read {path}: {source}")]
    ReadError {
        /// Offending file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A config file, or the merged tree, is not valid TOML for [`Config`](crate::Config).
    #[error("cannot parse {path}: {source}")]
    ParseError {
        /// Offending file, or a `<...>` marker for in-memory trees.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range or malformed.
    #[error("invalid {field}: {message}")]
    ValidationError {
        /// Dotted field path, or the file path for file-level checks.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// No home directory, so the user config location is unknown.
    #[error("no home directory; pass an explicit .plexus directory")]
    NoHomeDir,
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
