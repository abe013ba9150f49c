//! Ordered, acknowledged response writes and the deferred-close protocol.
//!
//! [`ResponseWriter`] is the bookkeeping half that lives with the
//! connection: it submits byte buffers to the writer task and counts how
//! many have not been acknowledged yet. The writer task owns the write side
//! of the socket, performs the writes strictly in submission order and
//! reports one completion per write. A close request is only turned into a
//! physical close once every submitted write has been acknowledged.
//!
//! The queue between the two is unbounded: submitting never waits, and
//! queued bytes stay in memory until the peer accepts them.

use std::io;
use log::debug;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Work for the writer task.
#[derive(Debug)]
pub(crate) enum WriteOp {
    Data(Vec<u8>),
    Close,
}

/// Outgoing half of a connection.
#[derive(Debug)]
pub struct ResponseWriter {
    ops: mpsc::UnboundedSender<WriteOp>,
    pending_writes: usize,
    must_close: bool,
    closed: bool,
}

impl ResponseWriter {
    /// Create a writer and the receiving end its writer task consumes.
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<WriteOp>) {
        let (ops, rx) = mpsc::unbounded_channel();
        let writer = Self {
            ops,
            pending_writes: 0,
            must_close: false,
            closed: false,
        };
        (writer, rx)
    }

    /// Queue `bytes` for writing after everything submitted before.
    pub fn submit_write(&mut self, bytes: Vec<u8>) {
        if self.closed {
            debug!("Dropping {} bytes written after close", bytes.len());
            return;
        }
        if self.ops.send(WriteOp::Data(bytes)).is_ok() {
            self.pending_writes += 1;
        }
    }

    /// Record the completion of one submitted write.
    ///
    /// Failures are logged and otherwise treated as done. Returns `true`
    /// when a deferred close is now due.
    pub fn on_write_complete(&mut self, result: io::Result<()>) -> bool {
        if let Err(e) = result {
            debug!("Writing response: {e}");
        }
        self.pending_writes = self.pending_writes.saturating_sub(1);
        self.pending_writes == 0 && self.must_close && !self.closed
    }

    /// Ask for the connection to close once pending writes drain.
    ///
    /// Returns `true` when nothing is pending and the close may happen
    /// immediately. Repeated requests are no-ops.
    pub fn request_close(&mut self) -> bool {
        if self.closed || self.must_close {
            return false;
        }
        if self.pending_writes == 0 {
            return true;
        }
        self.must_close = true;
        false
    }

    /// Submit the physical close. Returns `false` if already closed.
    ///
    /// The close is queued behind any outstanding writes, so the socket is
    /// never released while a write is in flight.
    pub(crate) fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        let _ = self.ops.send(WriteOp::Close);
        true
    }

    /// Writes submitted but not yet acknowledged.
    pub fn pending_writes(&self) -> usize {
        self.pending_writes
    }

    /// Whether a close was requested while writes were in flight.
    pub fn is_closing(&self) -> bool {
        self.must_close
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Writer task: perform queued writes in order, then shut the sink down.
pub(crate) async fn drive_writes<W>(
    mut sink: W,
    mut ops: mpsc::UnboundedReceiver<WriteOp>,
    done: mpsc::UnboundedSender<io::Result<()>>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(op) = ops.recv().await {
        match op {
            WriteOp::Data(bytes) => {
                let result = sink.write_all(&bytes).await;
                let _ = done.send(result);
            }
            WriteOp::Close => {
                if let Err(e) = sink.shutdown().await {
                    debug!("Shutting down socket: {e}");
                }
                break;
            }
        }
    }
}
