//! Entry name rewriting.
//!
//! Hosted archives place every entry under one synthetic directory such as
//! `octo-repo-1a2b3c4/`. Stripping removes exactly that first segment and
//! depends only on the name currently observed, so an archive that was
//! stripped and re-wrapped strips back to the same relative paths.

use crate::error::{ArchiveError, ArchiveResult};

/// Name of the pax global extended header entry written by `git archive`.
pub const PAX_GLOBAL_HEADER: &str = "pax_global_header";

/// Why an entry is left out of the output regardless of exclusion patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Pax global metadata, not a file.
    Metadata,
    /// The synthetic top-level directory itself.
    TopLevelDirectory,
}

/// Outcome of rewriting one entry name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDisposition {
    /// Drop the entry.
    Skip(SkipReason),
    /// Keep the entry under this name (subject to exclusion patterns).
    Emit(String),
}

/// Rewrite a source entry name.
///
/// A name with no `/` at all cannot carry a prefix. A directory entry of
/// that shape is the top-level directory written without its trailing
/// slash and is skipped; a file entry keeps its name unchanged.
///
/// # Errors
///
/// Returns [`ArchiveError::AbsolutePath`] if `name` starts with `/` or
/// would start with `/` once its prefix is removed.
pub fn strip_entry_name(name: &str, is_dir: bool) -> ArchiveResult<EntryDisposition> {
    if name == PAX_GLOBAL_HEADER {
        return Ok(EntryDisposition::Skip(SkipReason::Metadata));
    }
    if name.starts_with('/') {
        return Err(ArchiveError::AbsolutePath {
            path: name.to_owned(),
        });
    }

    let segments: Vec<&str> = name.split('/').collect();
    match segments.as_slice() {
        [_, ""] => Ok(EntryDisposition::Skip(SkipReason::TopLevelDirectory)),
        [_] if is_dir => Ok(EntryDisposition::Skip(SkipReason::TopLevelDirectory)),
        [only] => {
            tracing::warn!(name = %only, "archive entry has no top-level prefix; keeping name");
            Ok(EntryDisposition::Emit((*only).to_owned()))
        },
        [_, rest @ ..] => {
            let renamed = rest.join("/");
            // `prefix//etc/passwd` would otherwise come out rooted.
            if renamed.starts_with('/') {
                return Err(ArchiveError::AbsolutePath {
                    path: name.to_owned(),
                });
            }
            Ok(EntryDisposition::Emit(renamed))
        },
        [] => Ok(EntryDisposition::Emit(String::new())),
    }
}

/// Rewrite a hard-link target, which names another entry of the archive.
///
/// Targets that do not carry a prefix are returned unchanged.
///
/// # Errors
///
/// Returns [`ArchiveError::AbsolutePath`] for rooted targets.
pub(crate) fn strip_link_target(target: &str) -> ArchiveResult<String> {
    match strip_entry_name(target, false)? {
        EntryDisposition::Emit(stripped) => Ok(stripped),
        EntryDisposition::Skip(_) => Ok(target.to_owned()),
    }
}
