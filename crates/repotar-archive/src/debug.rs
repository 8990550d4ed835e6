//! Debug copy of the output archive.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{info, warn};

/// Create a persisted temp file to receive a copy of the output archive.
///
/// The file is named `output-tar*.tar.gz` in the system temp directory and
/// is not removed when the handle is dropped.
///
/// # Errors
///
/// Returns an error if the file cannot be created or persisted.
pub fn temp_file_tap() -> io::Result<(File, PathBuf)> {
    let file = tempfile::Builder::new()
        .prefix("output-tar")
        .suffix(".tar.gz")
        .tempfile()?;
    let (file, path) = file.keep().map_err(|e| e.error)?;
    info!(path = %path.display(), "writing debug copy of output archive");
    Ok((file, path))
}

/// Mirrors output bytes to a side writer until the first failure.
pub(crate) struct DebugTap {
    writer: Option<Box<dyn Write + Send>>,
}

impl DebugTap {
    pub(crate) fn new(writer: Option<Box<dyn Write + Send>>) -> Self {
        Self { writer }
    }

    pub(crate) fn mirror(&mut self, buf: &[u8]) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_all(buf) {
            warn!(error = %e, "debug tap write failed; disabling tap");
            self.writer = None;
        }
    }

    pub(crate) fn flush(&mut self) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if let Err(e) = writer.flush() {
            warn!(error = %e, "debug tap flush failed; disabling tap");
            self.writer = None;
        }
    }
}
