//! Archive transform error types.

use std::io;

/// Errors from building or evaluating an exclusion pattern set.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    /// A pattern line could not be compiled.
    #[error("invalid exclusion pattern on line {line} ('{pattern}'): {message}")]
    Syntax {
        /// 1-based line number within the ignore file.
        line: usize,
        /// The offending pattern text.
        pattern: String,
        /// Parser message.
        message: String,
    },

    /// The compiled matcher could not be built from the accepted lines.
    #[error("failed to build exclusion matcher: {0}")]
    Build(String),

    /// The matcher was asked about a path it cannot evaluate.
    #[error("cannot match path against exclusion patterns: {path}")]
    Unmatchable {
        /// The path that was rejected.
        path: String,
    },
}

/// Result type for pattern operations.
pub type PatternResult<T> = Result<T, PatternError>;

/// Errors that terminate a transform session.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// The compressed or tar stream could not be decoded.
    #[error("malformed archive: {message}")]
    Format {
        /// Description of the decode failure.
        message: String,
    },

    /// An entry name is an absolute path.
    #[error("archive contains absolute path: {path}")]
    AbsolutePath {
        /// The offending entry name.
        path: String,
    },

    /// An entry name is not valid UTF-8.
    #[error("archive entry name is not valid UTF-8: {name}")]
    NonUtf8Name {
        /// Lossy rendering of the name.
        name: String,
    },

    /// Exclusion matching failed for an entry.
    #[error("error matching {path} against exclusion patterns: {source}")]
    Pattern {
        /// The (renamed) entry path being matched.
        path: String,
        /// Underlying matcher error.
        #[source]
        source: PatternError,
    },

    /// Copying an entry into the output failed.
    #[error("failed to write entry {path}: {source}")]
    Entry {
        /// The (renamed) entry path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Writing the archive terminator or gzip trailer failed.
    #[error("failed to finalize output archive: {0}")]
    Finalize(#[source] io::Error),

    /// No async runtime was available to run the producer.
    #[error("archive producer requires a tokio runtime: {0}")]
    Runtime(String),

    /// The producer task ended abnormally.
    #[error("archive producer task failed: {0}")]
    Producer(String),
}

impl ArchiveError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format {
            message: message.into(),
        }
    }
}

impl From<ArchiveError> for io::Error {
    fn from(err: ArchiveError) -> Self {
        io::Error::other(err)
    }
}

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;
