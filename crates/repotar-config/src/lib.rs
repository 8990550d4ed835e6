#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for repotar.
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. The file passed with `--config` (must exist)
//! 2. The user file `<config_dir>/repotar/config.toml`
//! 3. Environment variables (`REPOTAR_*`, `GITHUB_TOKEN`), fallback only
//! 4. Embedded defaults (`defaults.toml` compiled into the binary)
//!
//! ```rust,no_run
//! use repotar_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("timeout: {}s", resolved.config.fetch.timeout_secs);
//! ```

/// Environment variable fallbacks.
pub mod env;
/// Configuration error types.
pub mod error;
/// File discovery and layered loading.
pub mod loader;
/// TOML tree merging with per-field source tracking.
pub mod merge;
/// Configuration types.
pub mod types;
/// Post-merge validation.
pub mod validate;

use std::path::Path;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use merge::{ConfigLayer, FieldSources};
pub use types::{Config, DebugSection, FetchSection, GitHubSection, LoggingSection};

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a file is unreadable or malformed, the
    /// explicit file is missing, or the result fails validation.
    pub fn load(explicit: Option<&Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }
}
