//! `repotar strip`.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use repotar_archive::{ExclusionPatterns, TransformSummary, transform};
use tracing::{info, warn};

/// Repackage the local archive at `input`.
pub(crate) async fn run_strip(
    input: &Path,
    output: Option<&Path>,
    ignore_file: Option<&Path>,
    excludes: &[String],
) -> Result<()> {
    let patterns = load_patterns(ignore_file, excludes).await?;
    let input = input.to_path_buf();
    let output = output.map(Path::to_path_buf);

    let summary =
        tokio::task::spawn_blocking(move || strip_file(&input, output.as_deref(), &patterns))
            .await
            .context("strip task failed")??;

    info!(
        entries_read = summary.entries_read,
        emitted = summary.emitted,
        excluded = summary.excluded,
        commit = summary.archive_comment.as_deref().unwrap_or("-"),
        "archive repackaged"
    );
    Ok(())
}

/// Patterns from `ignore_file` followed by `excludes`.
async fn load_patterns(
    ignore_file: Option<&Path>,
    excludes: &[String],
) -> Result<ExclusionPatterns> {
    let mut lines = Vec::new();
    if let Some(path) = ignore_file {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read ignore file {}", path.display()))?;
        lines.extend(content.lines().map(str::to_owned));
    }
    lines.extend(excludes.iter().cloned());

    ExclusionPatterns::from_patterns(&lines).context("invalid exclusion pattern")
}

fn strip_file(
    input: &Path,
    output: Option<&Path>,
    patterns: &ExclusionPatterns,
) -> Result<TransformSummary> {
    let source = File::open(input)
        .map(BufReader::new)
        .with_context(|| format!("failed to open {}", input.display()))?;

    let Some(path) = output else {
        let stdout = io::stdout().lock();
        let (summary, mut sink) = transform(source, BufWriter::new(stdout), patterns)
            .with_context(|| format!("failed to repackage {}", input.display()))?;
        sink.flush()?;
        return Ok(summary);
    };

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let result = transform(source, BufWriter::new(file), patterns)
        .map_err(anyhow::Error::from)
        .and_then(|(summary, mut sink)| {
            sink.flush()?;
            Ok(summary)
        });

    if result.is_err() {
        remove_partial(path.to_path_buf());
    }
    result.with_context(|| format!("failed to repackage {}", input.display()))
}

fn remove_partial(path: PathBuf) {
    if let Err(e) = std::fs::remove_file(&path) {
        warn!(path = %path.display(), error = %e, "failed to remove partial output");
    }
}
