//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
const VALID_FORMATS: [&str; 4] = ["pretty", "compact", "json", "full"];

/// Check a merged configuration. Stops at the first problem.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    check_manager(config)?;
    check_logging(config)
}

fn check_manager(config: &Config) -> ConfigResult<()> {
    let manager = &config.manager;
    if let Some(name) = manager.bootstrap.as_deref()
        && !is_capability_type(name)
    {
        return Err(ConfigError::invalid(
            "manager.bootstrap",
            format!("'{name}' is not a capability type; use ASCII letters, digits, '-' or '_'"),
        ));
    }
    if manager.descriptor_dirs.iter().any(|dir| dir.as_os_str().is_empty()) {
        return Err(ConfigError::invalid(
            "manager.descriptor_dirs",
            "descriptor directories must not be empty paths",
        ));
    }
    Ok(())
}

fn check_logging(config: &Config) -> ConfigResult<()> {
    let logging = &config.logging;
    one_of("logging.level", &logging.level, &VALID_LEVELS)?;
    one_of("logging.format", &logging.format, &VALID_FORMATS)?;
    match logging.directives.iter().position(|d| d.trim().is_empty()) {
        Some(index) => Err(ConfigError::invalid(
            "logging.directives",
            format!("directive #{index} is blank"),
        )),
        None => Ok(()),
    }
}

fn one_of(field: &str, value: &str, allowed: &[&str]) -> ConfigResult<()> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::invalid(
        field,
        format!("'{value}' is not one of {}", allowed.join("/")),
    ))
}

/// Same charset as `CapabilityId`; this crate does not depend on the core.
fn is_capability_type(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
