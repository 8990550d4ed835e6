use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Code host API settings.
    pub github: GitHubSection,
    /// Fetch pipeline settings.
    pub fetch: FetchSection,
    /// Logging settings.
    pub logging: LoggingSection,
    /// Debug aids.
    pub debug: DebugSection,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("github", &self.github)
            .field("fetch", &self.fetch)
            .field("logging", &self.logging)
            .field("debug", &self.debug)
            .finish()
    }
}

/// `[github]`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    /// API base URL.
    pub api_url: String,
    /// Bearer token. Never serialized.
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// `User-Agent` override.
    pub user_agent: Option<String>,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_owned(),
            token: None,
            user_agent: None,
        }
    }
}

impl fmt::Debug for GitHubSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubSection")
            .field("api_url", &self.api_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// `[fetch]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Budget for each remote call, in seconds.
    pub timeout_secs: u64,
    /// Ignore file read from the repository.
    pub ignore_file: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            ignore_file: ".dockerignore".to_owned(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default level or filter directive.
    pub level: String,
    /// `pretty`, `compact`, or `json`.
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
        }
    }
}

/// `[debug]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugSection {
    /// Keep a copy of every produced archive in the temp directory.
    pub dump_output: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let section = GitHubSection {
            token: Some("ghp_secret".to_owned()),
            ..GitHubSection::default()
        };
        let rendered = format!("{section:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("ghp_secret"));
    }

    #[test]
    fn serialize_omits_token() {
        let mut config = Config::default();
        config.github.token = Some("ghp_secret".to_owned());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("ghp_secret"));
        assert!(rendered.contains("timeout_secs = 300"));
    }
}
