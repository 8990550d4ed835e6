//! Fetch error types.

use std::time::Duration;

use repotar_archive::PatternError;

use crate::remote::RemoteError;

/// Errors from fetching and preparing a repository archive.
///
/// Each variant names the step that failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The repository reference could not be parsed.
    #[error("invalid repository reference: {0}")]
    InvalidRepo(String),

    /// The remote client could not be constructed.
    #[error("failed to build remote client: {0}")]
    Client(#[source] RemoteError),

    /// Resolving the ref to a commit failed.
    #[error("failed to resolve commit for {repo}: {source}")]
    ResolveCommit {
        /// Repository being resolved.
        repo: String,
        /// Underlying remote error.
        #[source]
        source: RemoteError,
    },

    /// The ignore file exists but could not be retrieved.
    #[error("failed to fetch ignore file {path} for {repo}: {source}")]
    IgnoreFile {
        /// Repository being fetched.
        repo: String,
        /// Ignore file path within the repository.
        path: String,
        /// Underlying remote error.
        #[source]
        source: RemoteError,
    },

    /// The ignore file contains an invalid pattern.
    #[error("invalid ignore file {path}: {source}")]
    IgnorePatterns {
        /// Ignore file path within the repository.
        path: String,
        /// Pattern compilation error.
        #[source]
        source: PatternError,
    },

    /// The archive link request failed in transport.
    #[error("failed to request archive link for {repo}: {source}")]
    ArchiveLink {
        /// Repository being fetched.
        repo: String,
        /// Underlying remote error.
        #[source]
        source: RemoteError,
    },

    /// The archive link request returned a failure status.
    #[error("archive link request for {repo} returned HTTP {status}")]
    ArchiveLinkStatus {
        /// Repository being fetched.
        repo: String,
        /// HTTP status code.
        status: u16,
    },

    /// The archive link response carried no URL.
    #[error("no archive download URL returned for {repo}")]
    MissingArchiveUrl {
        /// Repository being fetched.
        repo: String,
    },

    /// The archive download failed in transport.
    #[error("failed to download archive for {repo}: {source}")]
    Download {
        /// Repository being fetched.
        repo: String,
        /// Underlying remote error.
        #[source]
        source: RemoteError,
    },

    /// The archive download returned a failure status.
    #[error("archive download for {repo} returned HTTP {status}")]
    DownloadStatus {
        /// Repository being fetched.
        repo: String,
        /// HTTP status code.
        status: u16,
    },

    /// A remote call exceeded its time budget.
    #[error("{operation} timed out after {}s", .timeout.as_secs())]
    Timeout {
        /// The step that timed out.
        operation: &'static str,
        /// The budget that was exceeded.
        timeout: Duration,
    },
}

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;
