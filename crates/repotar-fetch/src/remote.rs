//! The remote repository surface.

use async_trait::async_trait;
use tokio::io::AsyncRead;
use url::Url;

use crate::repo::RepoRef;

/// Raw archive bytes as they arrive from the network.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Errors reported by a [`RemoteRepository`].
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The requested resource does not exist.
    #[error("{resource} not found")]
    NotFound {
        /// What was requested.
        resource: String,
    },

    /// The server answered with a failure status.
    #[error("{context}: server returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The request that failed.
        context: String,
    },

    /// The request never produced a response.
    #[error("{context}: {message}")]
    Transport {
        /// The request that failed.
        context: String,
        /// Transport error message.
        message: String,
    },

    /// The response could not be decoded.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Decode error message.
        message: String,
    },

    /// The client could not be configured.
    #[error("invalid client configuration: {message}")]
    Client {
        /// Configuration error message.
        message: String,
    },
}

impl RemoteError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Operations a code host must provide to serve archives.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Resolve the ref of `repo` to a commit id.
    async fn resolve_commit(&self, repo: &RepoRef) -> RemoteResult<String>;

    /// Read a text file at `path` as of the ref of `repo`.
    ///
    /// A missing file must be reported as [`RemoteError::NotFound`].
    async fn file_content(&self, repo: &RepoRef, path: &str) -> RemoteResult<String>;

    /// Ask for a short-lived download URL for the archive of `repo`.
    async fn archive_link(&self, repo: &RepoRef) -> RemoteResult<Option<Url>>;

    /// Open the archive body at `url`.
    async fn download(&self, url: &Url) -> RemoteResult<ByteStream>;
}
