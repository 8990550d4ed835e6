//! `repotar fetch`.

use std::path::Path;

use anyhow::{Context, Result};
use repotar_archive::debug::temp_file_tap;
use repotar_config::Config;
use repotar_fetch::RepoRef;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{info, warn};

use crate::config_bridge;

/// Fetch `repo` and write the repackaged archive to `output` or stdout.
pub(crate) async fn run_fetch(
    config: &Config,
    repo: &str,
    output: Option<&Path>,
    debug_dump: bool,
) -> Result<()> {
    let repo = RepoRef::parse(repo)?;
    let fetcher = config_bridge::to_fetcher(config)?;

    let mut archive = fetcher
        .fetch(&repo)
        .await
        .with_context(|| format!("could not fetch {repo}"))?;

    if debug_dump || config.debug.dump_output {
        let (file, _path) = temp_file_tap().context("failed to create debug output file")?;
        archive = archive.with_debug_tap(file);
    }

    let mut reader = archive.into_async_read();
    let written = write_output(&mut reader, output)
        .await
        .with_context(|| format!("failed to stream archive of {repo}"))?;

    info!(repo = %repo, bytes = written, "archive written");
    Ok(())
}

/// Copy `reader` to `output`, or to stdout when `output` is `None`.
///
/// A partially written output file is removed on failure.
async fn write_output<R>(reader: &mut R, output: Option<&Path>) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    let Some(path) = output else {
        let mut stdout = tokio::io::stdout();
        let written = tokio::io::copy(reader, &mut stdout).await?;
        stdout.flush().await?;
        return Ok(written);
    };

    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("failed to create {}", path.display()))?;

    let copied = async {
        let written = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        Ok::<_, std::io::Error>(written)
    }
    .await;

    match copied {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(file);
            if let Err(remove) = tokio::fs::remove_file(path).await {
                warn!(path = %path.display(), error = %remove, "failed to remove partial output");
            }
            Err(e.into())
        },
    }
}
