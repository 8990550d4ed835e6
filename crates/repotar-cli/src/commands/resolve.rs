//! `repotar resolve`.

use anyhow::{Context, Result};
use repotar_config::Config;
use repotar_fetch::RepoRef;

use crate::config_bridge;

/// Print the commit id that the ref of `repo` points at.
pub(crate) async fn run_resolve(config: &Config, repo: &str) -> Result<()> {
    let repo = RepoRef::parse(repo)?;
    let fetcher = config_bridge::to_fetcher(config)?;

    let sha = fetcher
        .resolve_commit(&repo)
        .await
        .with_context(|| format!("could not resolve {repo}"))?;
    println!("{sha}");
    Ok(())
}
