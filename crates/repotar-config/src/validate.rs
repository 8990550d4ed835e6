use std::path::{Component, Path};

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound for `fetch.timeout_secs` (one hour).
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_github(config)?;
    validate_fetch(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_github(config: &Config) -> ConfigResult<()> {
    let url = config.github.api_url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(invalid(
            "github.api_url",
            format!("must be an http(s) URL, got '{url}'"),
        )),
    }
}

fn validate_fetch(config: &Config) -> ConfigResult<()> {
    let timeout = config.fetch.timeout_secs;
    if timeout == 0 || timeout > MAX_TIMEOUT_SECS {
        return Err(invalid(
            "fetch.timeout_secs",
            format!("must be between 1 and {MAX_TIMEOUT_SECS}, got {timeout}"),
        ));
    }

    let ignore_file = config.fetch.ignore_file.as_str();
    if ignore_file.is_empty() {
        return Err(invalid("fetch.ignore_file", "must not be empty"));
    }
    let path = Path::new(ignore_file);
    if ignore_file.starts_with('/') || path.has_root() {
        return Err(invalid(
            "fetch.ignore_file",
            format!("must be relative to the repository root, got '{ignore_file}'"),
        ));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(invalid(
            "fetch.ignore_file",
            format!("must not contain '..', got '{ignore_file}'"),
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    if !matches!(config.logging.format.as_str(), "pretty" | "compact" | "json") {
        return Err(invalid(
            "logging.format",
            format!(
                "must be one of pretty, compact, json; got '{}'",
                config.logging.format
            ),
        ));
    }
    if config.logging.level.trim().is_empty() {
        return Err(invalid("logging.level", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn timeout_bounds() {
        let mut config = Config::default();
        config.fetch.timeout_secs = 0;
        assert!(validate(&config).is_err());
        config.fetch.timeout_secs = 3601;
        assert!(validate(&config).is_err());
        config.fetch.timeout_secs = 3600;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn api_url_scheme() {
        let mut config = Config::default();
        config.github.api_url = "ftp://example.com".to_owned();
        assert!(validate(&config).is_err());
        config.github.api_url = "http://localhost:8080".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn ignore_file_must_stay_in_repo() {
        let mut config = Config::default();
        for bad in ["", "/etc/ignore", "../outside", "a/../../b"] {
            config.fetch.ignore_file = bad.to_owned();
            let err = validate(&config).unwrap_err();
            let rejected = matches!(
                err,
                ConfigError::ValidationError { ref field, .. } if field == "fetch.ignore_file"
            );
            assert!(rejected, "{bad:?} should be rejected");
        }
        config.fetch.ignore_file = "deploy/.dockerignore".to_owned();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn unknown_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }
}
