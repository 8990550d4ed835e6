//! Fetch hosted repository archives and repackage them on the fly.
//!
//! [`ArchiveFetcher`] drives three sequential remote calls against a
//! [`RemoteRepository`]: the ignore file at the requested ref, the archive
//! download link, and the archive itself. The downloaded bytes are handed to
//! [`repotar_archive::StrippedArchive`] unread; repackaging starts when the
//! caller first polls the returned stream.
//!
//! [`GitHubClient`] is the `reqwest`-backed implementation of the remote
//! surface.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod fetcher;
pub mod github;
pub mod remote;
pub mod repo;

pub use error::{FetchError, FetchResult};
pub use fetcher::{ArchiveFetcher, DEFAULT_IGNORE_FILE, DEFAULT_TIMEOUT};
pub use github::{DEFAULT_API_URL, GitHubClient, GitHubClientBuilder};
pub use remote::{ByteStream, RemoteError, RemoteRepository, RemoteResult};
pub use repo::{DEFAULT_REF, RepoRef};
