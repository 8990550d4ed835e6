//! Load order:
//! 1. Parse the embedded `defaults.toml`
//! 2. Merge `<config_dir>/repotar/config.toml` (user)
//! 3. Merge the explicit `--config` file, which must exist
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize and validate

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_leaves};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// A loaded configuration and where its values came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The validated configuration.
    pub config: Config,
    /// Layer that set each leaf field.
    pub field_sources: FieldSources,
    /// Files merged, in load order.
    pub loaded_files: Vec<String>,
}

/// Load with the standard user config location and the process environment.
///
/// # Errors
///
/// See [`load_from`].
pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    load_from(explicit, user_config_path().as_deref(), &collect_env_vars())
}

/// Load from explicit locations and an explicit environment.
///
/// `user_config` is skipped when `None` or when the file does not exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, the
/// explicit file is missing, or the merged result fails validation.
pub fn load_from<S: BuildHasher>(
    explicit: Option<&Path>,
    user_config: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_leaves(&merged, "", &ConfigLayer::Defaults, &mut field_sources);

    if let Some(path) = user_config
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", &ConfigLayer::User, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    if let Some(path) = explicit {
        let Some(overlay) = try_load_file(path)? else {
            return Err(ConfigError::MissingFile {
                path: path.display().to_string(),
            });
        };
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            &ConfigLayer::Explicit,
            &mut field_sources,
        );
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded config file");
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// `<config_dir>/repotar/config.toml`, if a home directory can be found.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.config_dir().join("repotar").join("config.toml"))
}

/// Read and parse a file, returning `None` if it does not exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len()
            ),
        });
    }

    toml::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            source: e,
        })
}
