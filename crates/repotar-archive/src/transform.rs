//! The per-entry decode → strip → filter → encode loop.

use std::cell::Cell;
use std::io::{self, Read, Write};
use std::rc::Rc;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, Entry, EntryType};
use tracing::{debug, trace};

use crate::error::{ArchiveError, ArchiveResult};
use crate::pattern::ExclusionPatterns;
use crate::strip::{EntryDisposition, PAX_GLOBAL_HEADER, strip_entry_name, strip_link_target};

/// Counters describing one completed transform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformSummary {
    /// Entries decoded from the source, including skipped ones.
    pub entries_read: u64,
    /// Entries written to the output.
    pub emitted: u64,
    /// Pax metadata and top-level directory entries dropped.
    pub metadata_skipped: u64,
    /// Entries dropped by exclusion patterns.
    pub excluded: u64,
    /// `comment` record of the pax global header (the commit id for
    /// archives produced by `git archive`).
    pub archive_comment: Option<String>,
}

/// Transform a gzip-compressed tarball read from `source` into `sink`.
///
/// Runs to completion on the calling thread. On success the output has
/// been terminated and flushed, and `sink` is handed back. On failure the
/// output written so far is left in place without a tar terminator or gzip
/// trailer, so it cannot be mistaken for a complete archive.
///
/// # Errors
///
/// Any decode error, absolute entry path, matcher error, or write error
/// aborts the transform.
pub fn transform<R, W>(
    source: R,
    sink: W,
    patterns: &ExclusionPatterns,
) -> ArchiveResult<(TransformSummary, W)>
where
    R: Read,
    W: Write,
{
    let source_failed = Rc::new(Cell::new(false));
    let mut archive = Archive::new(SourceReader {
        inner: GzDecoder::new(source),
        failed: Rc::clone(&source_failed),
    });
    let mut builder = Builder::new(GzEncoder::new(
        SealableWriter::new(sink),
        Compression::default(),
    ));
    let mut summary = TransformSummary::default();

    if let Err(err) = copy_entries(
        &mut archive,
        &mut builder,
        patterns,
        &source_failed,
        &mut summary,
    ) {
        // Builder and encoder both finalize on drop; keep that out of the sink.
        builder.get_mut().get_mut().seal();
        return Err(err);
    }

    let encoder = builder.into_inner().map_err(ArchiveError::Finalize)?;
    let mut sink = encoder
        .finish()
        .map_err(ArchiveError::Finalize)?
        .into_inner();
    sink.flush().map_err(ArchiveError::Finalize)?;

    Ok((summary, sink))
}

fn copy_entries<R, W>(
    archive: &mut Archive<R>,
    builder: &mut Builder<W>,
    patterns: &ExclusionPatterns,
    source_failed: &Cell<bool>,
    summary: &mut TransformSummary,
) -> ArchiveResult<()>
where
    R: Read,
    W: Write,
{
    let entries = archive
        .entries()
        .map_err(|e| ArchiveError::format(format!("failed to read archive entries: {e}")))?;

    for entry in entries {
        let mut entry = entry
            .map_err(|e| ArchiveError::format(format!("failed to read archive entry: {e}")))?;
        summary.entries_read = summary.entries_read.saturating_add(1);

        let entry_type = entry.header().entry_type();
        let name = entry_name(&entry)?;

        if entry_type == EntryType::XGlobalHeader || name == PAX_GLOBAL_HEADER {
            if let Some(comment) = global_comment(&mut entry)? {
                debug!(comment = %comment, "archive global header");
                summary.archive_comment = Some(comment);
            }
            summary.metadata_skipped = summary.metadata_skipped.saturating_add(1);
            continue;
        }

        let is_dir = entry_type.is_dir();
        let renamed = match strip_entry_name(&name, is_dir)? {
            EntryDisposition::Skip(reason) => {
                trace!(name = %name, ?reason, "skipping entry");
                summary.metadata_skipped = summary.metadata_skipped.saturating_add(1);
                continue;
            },
            EntryDisposition::Emit(renamed) => renamed,
        };

        let excluded =
            patterns
                .matches(&renamed, is_dir)
                .map_err(|source| ArchiveError::Pattern {
                    path: renamed.clone(),
                    source,
                })?;
        if excluded {
            trace!(path = %renamed, "excluded by ignore pattern");
            summary.excluded = summary.excluded.saturating_add(1);
            continue;
        }

        write_entry(builder, &mut entry, entry_type, &renamed, source_failed)?;
        summary.emitted = summary.emitted.saturating_add(1);
    }

    Ok(())
}

fn entry_name<R: Read>(entry: &Entry<'_, R>) -> ArchiveResult<String> {
    String::from_utf8(entry.path_bytes().into_owned()).map_err(|e| ArchiveError::NonUtf8Name {
        name: String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

fn global_comment<R: Read>(entry: &mut Entry<'_, R>) -> ArchiveResult<Option<String>> {
    let Some(extensions) = entry
        .pax_extensions()
        .map_err(|e| ArchiveError::format(format!("failed to read pax global header: {e}")))?
    else {
        return Ok(None);
    };

    for extension in extensions {
        let extension = extension
            .map_err(|e| ArchiveError::format(format!("malformed pax global header: {e}")))?;
        if extension.key() == Ok("comment") {
            return Ok(extension.value().ok().map(str::to_owned));
        }
    }
    Ok(None)
}

fn write_entry<R, W>(
    builder: &mut Builder<W>,
    entry: &mut Entry<'_, R>,
    entry_type: EntryType,
    name: &str,
    source_failed: &Cell<bool>,
) -> ArchiveResult<()>
where
    R: Read,
    W: Write,
{
    // The payload is copied straight from the source, so a failed copy may
    // be a decode error rather than a write error.
    let entry_err = |source: io::Error| {
        if source_failed.get() {
            ArchiveError::format(format!("failed to read entry {name}: {source}"))
        } else {
            ArchiveError::Entry {
                path: name.to_owned(),
                source,
            }
        }
    };

    let mut header = entry.header().clone();
    // A ustar header may carry the old name split across `prefix`.
    if let Some(ustar) = header.as_ustar_mut() {
        ustar.prefix = [0; 155];
    }

    match entry_type {
        EntryType::Symlink | EntryType::Link => {
            let target = entry
                .link_name_bytes()
                .ok_or_else(|| ArchiveError::format(format!("link entry {name} has no target")))?;
            let target = String::from_utf8(target.into_owned()).map_err(|e| {
                ArchiveError::NonUtf8Name {
                    name: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                }
            })?;
            let target = if entry_type == EntryType::Link {
                strip_link_target(&target)?
            } else {
                target
            };
            builder
                .append_link(&mut header, name, &target)
                .map_err(entry_err)
        },
        _ => builder
            .append_data(&mut header, name, entry)
            .map_err(entry_err),
    }
}

/// Decompressed source that records whether a read has failed.
struct SourceReader<R> {
    inner: R,
    failed: Rc<Cell<bool>>,
}

impl<R: Read> Read for SourceReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| {
            if e.kind() != io::ErrorKind::Interrupted {
                self.failed.set(true);
            }
        })
    }
}

/// Writer that silently discards everything once sealed.
struct SealableWriter<W> {
    inner: W,
    sealed: bool,
}

impl<W: Write> SealableWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            sealed: false,
        }
    }

    fn seal(&mut self) {
        self.sealed = true;
    }

    fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for SealableWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.sealed {
            return Ok(buf.len());
        }
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.sealed {
            return Ok(());
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn gz_tar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = Builder::new(Vec::new());
        for &(path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            if path.ends_with('/') {
                header.set_entry_type(EntryType::Directory);
                header.set_mode(0o755);
            }
            builder.append_data(&mut header, path, data).unwrap();
        }
        let tar_data = builder.into_inner().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(&tar_data).unwrap();
        encoder.finish().unwrap()
    }

    fn names(tgz: &[u8]) -> Vec<String> {
        let mut archive = Archive::new(GzDecoder::new(tgz));
        archive
            .entries()
            .unwrap()
            .map(|e| String::from_utf8(e.unwrap().path_bytes().into_owned()).unwrap())
            .collect()
    }

    #[test]
    fn summary_counts_every_disposition() {
        let tgz = gz_tar(&[
            ("repo-abc/", b""),
            ("repo-abc/main.go", b"package main"),
            ("repo-abc/trace.log", b"noise"),
        ]);
        let patterns = ExclusionPatterns::from_patterns(["*.log"]).unwrap();

        let (summary, out) = transform(tgz.as_slice(), Vec::new(), &patterns).unwrap();

        assert_eq!(summary.entries_read, 3);
        assert_eq!(summary.metadata_skipped, 1);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.emitted, 1);
        assert_eq!(names(&out), ["main.go"]);
    }

    #[test]
    fn empty_archive_produces_valid_empty_output() {
        let tgz = gz_tar(&[]);
        let (summary, out) =
            transform(tgz.as_slice(), Vec::new(), &ExclusionPatterns::empty()).unwrap();
        assert_eq!(summary, TransformSummary::default());
        assert!(names(&out).is_empty());
    }

    #[test]
    fn non_gzip_input_is_a_format_error() {
        let err = transform(
            &b"definitely not gzip"[..],
            Vec::new(),
            &ExclusionPatterns::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, ArchiveError::Format { .. }), "got {err:?}");
    }

    #[test]
    fn sealed_writer_discards_writes() {
        let mut out = Vec::new();
        let mut writer = SealableWriter::new(&mut out);
        writer.write_all(b"kept").unwrap();
        writer.seal();
        writer.write_all(b"dropped").unwrap();
        writer.flush().unwrap();
        assert_eq!(out, b"kept");
    }
}
