//! Bridge from `repotar_config::Config` to the runtime types.

use std::time::Duration;

use repotar_config::Config;
use repotar_fetch::{ArchiveFetcher, FetchError, FetchResult, GitHubClient};
use repotar_telemetry::{LogConfig, LogFormat};

/// Logging settings from `[logging]`. Output always goes to stderr so stdout
/// can carry the archive.
pub(crate) fn to_log_config(config: &Config) -> LogConfig {
    let format = config
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or_default();
    LogConfig::new(config.logging.level.clone()).with_format(format)
}

/// A GitHub-backed fetcher from `[github]` and `[fetch]`.
pub(crate) fn to_fetcher(config: &Config) -> FetchResult<ArchiveFetcher<GitHubClient>> {
    let timeout = Duration::from_secs(config.fetch.timeout_secs);

    let mut builder = GitHubClient::builder()
        .with_api_url(config.github.api_url.clone())
        .with_token(config.github.token.clone())
        .with_timeout(timeout);
    if let Some(agent) = &config.github.user_agent {
        builder = builder.with_user_agent(agent.clone());
    }
    let client = builder.build().map_err(FetchError::Client)?;

    Ok(ArchiveFetcher::new(client)
        .with_timeout(timeout)
        .with_ignore_file(config.fetch.ignore_file.clone()))
}
