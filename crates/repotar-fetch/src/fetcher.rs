//! The fetch pipeline: ignore file → archive link → download → transform.

use std::future::Future;
use std::time::Duration;

use repotar_archive::{ExclusionPatterns, StrippedArchive};
use tracing::{debug, info};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::remote::{RemoteError, RemoteRepository, RemoteResult};
use crate::repo::RepoRef;

/// Time budget applied to every remote call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Ignore file read from the repository when none is configured.
pub const DEFAULT_IGNORE_FILE: &str = ".dockerignore";

/// Fetches repository archives and repackages them.
///
/// Every remote call is made once, in sequence, and is bounded by the same
/// timeout. Nothing is retried.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher<C> {
    client: C,
    timeout: Duration,
    ignore_file: String,
}

impl<C: RemoteRepository> ArchiveFetcher<C> {
    /// Wrap a remote client with default settings.
    pub fn new(client: C) -> Self {
        Self {
            client,
            timeout: DEFAULT_TIMEOUT,
            ignore_file: DEFAULT_IGNORE_FILE.to_owned(),
        }
    }

    /// Override the per-call time budget.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read exclusion patterns from a different file in the repository.
    #[must_use]
    pub fn with_ignore_file(mut self, path: impl Into<String>) -> Self {
        self.ignore_file = path.into();
        self
    }

    /// The underlying remote client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Resolve the ref of `repo` to a commit id.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ResolveCommit`] or [`FetchError::Timeout`].
    pub async fn resolve_commit(&self, repo: &RepoRef) -> FetchResult<String> {
        let sha = self
            .bounded("commit resolution", self.client.resolve_commit(repo))
            .await?
            .map_err(|source| FetchError::ResolveCommit {
                repo: repo.to_string(),
                source,
            })?;
        debug!(repo = %repo, sha = %sha, "resolved commit");
        Ok(sha)
    }

    /// Load the exclusion patterns of `repo`.
    ///
    /// A missing ignore file yields an empty set.
    ///
    /// # Errors
    ///
    /// Fails on any other remote error, a timeout, or an invalid pattern.
    pub async fn exclusion_patterns(&self, repo: &RepoRef) -> FetchResult<ExclusionPatterns> {
        let fetched = self
            .bounded(
                "ignore file fetch",
                self.client.file_content(repo, &self.ignore_file),
            )
            .await?;

        let content = match fetched {
            Ok(content) => content,
            Err(RemoteError::NotFound { .. }) => {
                debug!(repo = %repo, path = %self.ignore_file, "no ignore file; excluding nothing");
                return Ok(ExclusionPatterns::empty());
            },
            Err(source) => {
                return Err(FetchError::IgnoreFile {
                    repo: repo.to_string(),
                    path: self.ignore_file.clone(),
                    source,
                });
            },
        };

        let patterns = ExclusionPatterns::from_ignore_file(&content).map_err(|source| {
            FetchError::IgnorePatterns {
                path: self.ignore_file.clone(),
                source,
            }
        })?;
        debug!(repo = %repo, patterns = patterns.len(), "loaded exclusion patterns");
        Ok(patterns)
    }

    /// Obtain the short-lived archive download URL for `repo`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ArchiveLinkStatus`] on a failure status,
    /// [`FetchError::ArchiveLink`] on other remote errors,
    /// [`FetchError::MissingArchiveUrl`] if no URL came back, or
    /// [`FetchError::Timeout`].
    pub async fn archive_url(&self, repo: &RepoRef) -> FetchResult<Url> {
        let link = self
            .bounded("archive link request", self.client.archive_link(repo))
            .await?
            .map_err(|source| match source.status() {
                Some(status) => FetchError::ArchiveLinkStatus {
                    repo: repo.to_string(),
                    status,
                },
                None => FetchError::ArchiveLink {
                    repo: repo.to_string(),
                    source,
                },
            })?;

        link.ok_or_else(|| FetchError::MissingArchiveUrl {
            repo: repo.to_string(),
        })
    }

    /// Fetch the archive of `repo` and return its repackaged stream.
    ///
    /// The returned stream has not started; it reads the download on its
    /// first poll.
    ///
    /// # Errors
    ///
    /// Any failure of the three remote steps, each with its own variant.
    pub async fn fetch(&self, repo: &RepoRef) -> FetchResult<StrippedArchive> {
        info!(repo = %repo, ignore_file = %self.ignore_file, "fetching archive");

        let patterns = self.exclusion_patterns(repo).await?;
        let url = self.archive_url(repo).await?;

        let body = self
            .bounded("archive download", self.client.download(&url))
            .await?
            .map_err(|source| match source.status() {
                Some(status) => FetchError::DownloadStatus {
                    repo: repo.to_string(),
                    status,
                },
                None => FetchError::Download {
                    repo: repo.to_string(),
                    source,
                },
            })?;

        debug!(repo = %repo, "archive download started");
        Ok(StrippedArchive::new(body, patterns))
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> FetchResult<RemoteResult<T>>
    where
        F: Future<Output = RemoteResult<T>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| FetchError::Timeout {
                operation,
                timeout: self.timeout,
            })
    }
}
