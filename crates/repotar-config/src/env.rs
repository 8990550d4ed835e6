//! Environment variables are fallback, not override: they only fill fields
//! that no config file set.

use std::collections::HashMap;
use std::hash::BuildHasher;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources};

struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// Earlier entries win when several variables map to one field.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "REPOTAR_GITHUB_TOKEN",
        field_path: "github.token",
    },
    EnvMapping {
        var_name: "GITHUB_TOKEN",
        field_path: "github.token",
    },
    EnvMapping {
        var_name: "REPOTAR_API_URL",
        field_path: "github.api_url",
    },
    EnvMapping {
        var_name: "REPOTAR_TIMEOUT_SECS",
        field_path: "fetch.timeout_secs",
    },
    EnvMapping {
        var_name: "REPOTAR_IGNORE_FILE",
        field_path: "fetch.ignore_file",
    },
    EnvMapping {
        var_name: "REPOTAR_LOG_LEVEL",
        field_path: "logging.level",
    },
];

/// Apply environment fallbacks to fields not set by any file layer.
///
/// Returns the number of variables applied.
pub fn apply_env_fallbacks<S: BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        let settable = sources
            .get(mapping.field_path)
            .is_none_or(|layer| *layer == ConfigLayer::Defaults);
        if !settable {
            continue;
        }
        let Some(val) = env_vars.get(mapping.var_name).filter(|v| !v.is_empty()) else {
            continue;
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, coerce(mapping.field_path, val));
        sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
        count = count.saturating_add(1);
    }

    count
}

/// Snapshot the process environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let Some((parent, leaf)) = path.rsplit_once('.') else {
        if let Some(table) = root.as_table_mut() {
            table.insert(path.to_owned(), value);
        }
        return;
    };

    let mut current = root;
    for segment in parent.split('.') {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment.to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), value);
    }
}

fn coerce(path: &str, val: &str) -> toml::Value {
    if path == "fetch.timeout_secs"
        && let Ok(i) = val.parse::<i64>()
    {
        return toml::Value::Integer(i);
    }
    toml::Value::String(val.to_owned())
}
