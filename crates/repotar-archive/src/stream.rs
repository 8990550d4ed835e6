//! Async session wrapper around [`transform`](crate::transform).
//!
//! The synchronous decode/filter/encode loop runs on a blocking task. Its
//! output is chunked through a capacity-one channel into a [`Stream`] of
//! compressed bytes. Dropping the stream closes the channel; the producer's
//! next write then fails with `BrokenPipe` and the source is released.

use std::fmt;
use std::future::Future;
use std::io::{self, BufWriter, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::io::AsyncRead;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, info, warn};

use crate::debug::DebugTap;
use crate::error::ArchiveError;
use crate::pattern::ExclusionPatterns;
use crate::transform::transform;

/// Output is buffered into chunks of about this size before each handoff.
const CHUNK_SIZE: usize = 64 * 1024;

type BoxedSource = Box<dyn AsyncRead + Send + Unpin>;
type Chunk = io::Result<Bytes>;

/// A lazily started, stripped and filtered copy of a gzip tarball.
///
/// Yields compressed chunks of the output archive. A clean end of stream
/// means the archive was fully written; a failure is delivered as a final
/// `Err` item wrapping an [`ArchiveError`].
pub struct StrippedArchive {
    state: State,
}

enum State {
    Pending(Box<PendingSession>),
    Streaming {
        rx: mpsc::Receiver<Chunk>,
        producer: JoinHandle<()>,
    },
    Failed(ArchiveError),
    Finished,
}

struct PendingSession {
    source: BoxedSource,
    patterns: ExclusionPatterns,
    tap: Option<Box<dyn Write + Send>>,
}

impl StrippedArchive {
    /// Wrap a compressed source. Nothing is read until the first poll.
    pub fn new<R>(source: R, patterns: ExclusionPatterns) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            state: State::Pending(Box::new(PendingSession {
                source: Box::new(source),
                patterns,
                tap: None,
            })),
        }
    }

    /// Copy every output byte to `writer` as well.
    ///
    /// Has no effect once the session has started.
    #[must_use]
    pub fn with_debug_tap<W>(mut self, writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        if let State::Pending(pending) = &mut self.state {
            pending.tap = Some(Box::new(writer));
        }
        self
    }

    /// Whether the first poll has happened.
    #[must_use]
    pub fn is_started(&self) -> bool {
        !matches!(self.state, State::Pending(_))
    }

    /// Adapt the stream into an [`AsyncRead`].
    #[must_use]
    pub fn into_async_read(self) -> StreamReader<Self, Bytes> {
        StreamReader::new(self)
    }

    fn start(pending: PendingSession) -> State {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => return State::Failed(ArchiveError::Runtime(e.to_string())),
        };

        let (tx, rx) = mpsc::channel(1);
        let bridge_handle = handle.clone();
        let producer = handle.spawn_blocking(move || {
            let PendingSession {
                source,
                patterns,
                tap,
            } = pending;
            let source = SyncIoBridge::new_with_handle(source, bridge_handle);
            produce(source, &patterns, tap, tx);
        });

        debug!("archive producer started");
        State::Streaming { rx, producer }
    }
}

fn produce<R: io::Read>(
    source: R,
    patterns: &ExclusionPatterns,
    tap: Option<Box<dyn Write + Send>>,
    tx: mpsc::Sender<Chunk>,
) {
    let sink = BufWriter::with_capacity(
        CHUNK_SIZE,
        ChannelWriter {
            tx: tx.clone(),
            tap: DebugTap::new(tap),
        },
    );

    match transform(source, sink, patterns) {
        Ok((summary, _sink)) => {
            info!(
                entries_read = summary.entries_read,
                emitted = summary.emitted,
                metadata_skipped = summary.metadata_skipped,
                excluded = summary.excluded,
                commit = summary.archive_comment.as_deref().unwrap_or(""),
                "archive transform complete"
            );
        },
        // Only the channel knows whether the consumer hung up; a source can
        // fail with `BrokenPipe` too.
        Err(err) if tx.is_closed() => {
            debug!(error = %err, "archive consumer dropped; producer stopped");
        },
        Err(err) => {
            warn!(error = %err, "archive transform failed");
            // Fails only if the consumer left in the meantime.
            let _ = tx.blocking_send(Err(err.into()));
        },
    }
}

impl Stream for StrippedArchive {
    type Item = Chunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match std::mem::replace(&mut this.state, State::Finished) {
                State::Pending(pending) => this.state = Self::start(*pending),
                State::Failed(err) => return Poll::Ready(Some(Err(err.into()))),
                State::Finished => return Poll::Ready(None),
                State::Streaming {
                    mut rx,
                    mut producer,
                } => match rx.poll_recv(cx) {
                    Poll::Ready(Some(chunk)) => {
                        this.state = State::Streaming { rx, producer };
                        return Poll::Ready(Some(chunk));
                    },
                    Poll::Pending => {
                        this.state = State::Streaming { rx, producer };
                        return Poll::Pending;
                    },
                    // Channel closed: the producer is done, but only a clean
                    // join means the archive is complete.
                    Poll::Ready(None) => match Pin::new(&mut producer).poll(cx) {
                        Poll::Pending => {
                            this.state = State::Streaming { rx, producer };
                            return Poll::Pending;
                        },
                        Poll::Ready(Ok(())) => return Poll::Ready(None),
                        Poll::Ready(Err(e)) => {
                            return Poll::Ready(Some(Err(
                                ArchiveError::Producer(e.to_string()).into()
                            )));
                        },
                    },
                },
            }
        }
    }
}

impl fmt::Debug for StrippedArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            State::Pending(_) => "pending",
            State::Streaming { .. } => "streaming",
            State::Failed(_) => "failed",
            State::Finished => "finished",
        };
        f.debug_struct("StrippedArchive")
            .field("state", &state)
            .finish()
    }
}

/// Blocking writer that hands each buffer to the consumer.
struct ChannelWriter {
    tx: mpsc::Sender<Chunk>,
    tap: DebugTap,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer dropped"))?;
        self.tap.mirror(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.tap.flush();
        Ok(())
    }
}
