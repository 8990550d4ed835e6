//! Streaming tarball repackaging for repotar.
//!
//! Code hosts wrap every entry of a generated archive in a synthetic
//! top-level directory (`{repo}-{sha}/`). This crate consumes such a
//! gzip-compressed tarball and produces a new one where:
//!
//! - the first path segment of every entry is removed,
//! - the pax global header and the bare top-level directory are dropped,
//! - entries matching an ignore-file pattern set are omitted.
//!
//! The archive is never held in memory. [`StrippedArchive`] runs the
//! decode/filter/encode loop on a blocking task and hands compressed chunks
//! to the consumer through a single-slot channel, so a slow reader throttles
//! the producer.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use repotar_archive::{ExclusionPatterns, StrippedArchive};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = tokio::fs::File::open("repo.tar.gz").await?;
//! let patterns = ExclusionPatterns::from_ignore_file("*.log\n!keep.log\n")?;
//!
//! let mut archive = StrippedArchive::new(source, patterns);
//! while let Some(chunk) = archive.next().await {
//!     let bytes = chunk?;
//!     // forward `bytes` downstream
//! #   let _ = bytes;
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod debug;
pub mod error;
pub mod pattern;
pub mod stream;
pub mod strip;
pub mod transform;

pub use error::{ArchiveError, ArchiveResult, PatternError, PatternResult};
pub use pattern::ExclusionPatterns;
pub use stream::StrippedArchive;
pub use strip::{EntryDisposition, PAX_GLOBAL_HEADER, SkipReason, strip_entry_name};
pub use transform::{TransformSummary, transform};
