//! Environment variable overrides.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

/// Overrides `manager.bootstrap`.
pub const ENV_BOOTSTRAP: &str = "PLEXUS_BOOTSTRAP";

/// Overrides `logging.level`.
pub const ENV_LOG: &str = "PLEXUS_LOG";

const OVERRIDES: &[(&str, &str, &str)] = &[
    (ENV_BOOTSTRAP, "manager", "bootstrap"),
    (ENV_LOG, "logging", "level"),
];

/// Snapshot the `PLEXUS_*` variables of the current process.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with("PLEXUS_"))
        .collect()
}

/// Apply environment overrides to the merged tree.
///
/// Empty values are ignored. Returns the number of fields overridden.
pub fn apply_env_overrides(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String>,
) -> usize {
    let Some(root) = merged.as_table_mut() else {
        return 0;
    };

    let mut applied: usize = 0;
    for (var, section, field) in OVERRIDES {
        let Some(value) = env_vars.get(*var).map(|v| v.trim()).filter(|v| !v.is_empty()) else {
            continue;
        };
        let table = root
            .entry((*section).to_owned())
            .or_insert(toml::Value::Table(toml::Table::new()));
        if let Some(table) = table.as_table_mut() {
            table.insert((*field).to_owned(), toml::Value::String(value.to_owned()));
            sources.insert(format!("{section}.{field}"), ConfigLayer::Environment);
            debug!(var = *var, section = *section, field = *field, "applied environment override");
            applied = applied.saturating_add(1);
        }
    }
    applied
}
