//! One accepted socket and its read loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use log::{debug, error};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadHalf};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use crate::parser::RequestParser;
use crate::server::context::ServerContext;
use crate::server::registry::{ConnectionId, Registry};
use crate::server::request_context::{Disposition, RequestContext};
use crate::server::writer::{drive_writes, ResponseWriter};

/// An accepted connection serving one request at a time.
///
/// Reads are fed to the active [`RequestContext`]; a new context is created
/// on the first byte after the previous response was dispatched. The socket
/// is released in two steps: [`close`](Self::close) queues the shutdown
/// behind outstanding writes, and the connection leaves the registry only
/// once the writer task has finished with the socket.
pub struct Connection<S> {
    id: ConnectionId,
    remote_addr: SocketAddr,
    server_addr: SocketAddr,
    reader: ReadHalf<S>,
    writer: ResponseWriter,
    completions: mpsc::UnboundedReceiver<io::Result<()>>,
    write_task: JoinHandle<()>,
    request: Option<RequestContext>,
    ctx: Arc<ServerContext>,
    registry: Arc<Registry>,
    close_signal: Arc<Notify>,
    responses: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap `stream` and add it to `registry`.
    ///
    /// Must be called within a Tokio runtime; the writer task is spawned here.
    pub fn new(
        stream: S,
        remote_addr: SocketAddr,
        server_addr: SocketAddr,
        ctx: Arc<ServerContext>,
        registry: Arc<Registry>,
    ) -> Self {
        let (id, close_signal) = registry.register(remote_addr);
        let (reader, write_half) = tokio::io::split(stream);
        let (writer, ops) = ResponseWriter::new();
        let (done, completions) = mpsc::unbounded_channel();
        let write_task = tokio::spawn(drive_writes(write_half, ops, done));

        Self {
            id,
            remote_addr,
            server_addr,
            reader,
            writer,
            completions,
            write_task,
            request: None,
            ctx,
            registry,
            close_signal,
            responses: 0,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Serve requests until the connection is closed and released.
    ///
    /// Returns the number of responses dispatched on this connection.
    pub async fn run(mut self) -> usize {
        let debug_enabled = self.ctx.debug();
        if debug_enabled {
            debug!("Incoming connection from {}", self.remote_addr);
        }
        let mut buf = vec![0u8; self.ctx.config.read_buffer_size];

        while !self.writer.is_closed() {
            tokio::select! {
                biased;

                () = self.close_signal.notified() => self.close(),

                Some(result) = self.completions.recv() => {
                    if self.writer.on_write_complete(result) {
                        self.close();
                    }
                }

                // No more requests once a close is pending.
                read = self.reader.read(&mut buf), if !self.writer.is_closing() => match read {
                    Ok(0) => {
                        if debug_enabled {
                            debug!("Client {} closed connection", self.remote_addr);
                        }
                        self.close();
                    }
                    Ok(n) => self.on_data(&buf[..n]),
                    Err(e) => {
                        if debug_enabled {
                            debug!("Read error from {}: {e}", self.remote_addr);
                        }
                        self.close();
                    }
                },
            }
        }

        // The writer task ends after the queued shutdown.
        if let Err(e) = (&mut self.write_task).await {
            error!("Writer task for {} failed: {e}", self.remote_addr);
        }
        self.registry.remove(self.id);
        self.responses
    }

    fn on_data(&mut self, data: &[u8]) {
        let request = self.request.get_or_insert_with(|| {
            RequestContext::new(
                RequestParser::new(self.ctx.config.parse_limits()),
                self.remote_addr,
                self.server_addr,
            )
        });

        match request.feed(data, &mut self.writer, &self.ctx) {
            Ok(None) => {}
            Ok(Some(Disposition::Reuse)) => self.reuse(),
            Ok(Some(Disposition::Finish)) => self.finish(),
            Err(e) if e.is_contract_violation() => {
                error!("Application broke the response contract: {e}");
                self.close();
            }
            Err(e) if e.is_fatal_to_connection() => {
                error!("Parsing HTTP request from {}: {e}", self.remote_addr);
                self.close();
            }
            Err(e) if e.is_application_fault() => {
                error!("Running application for {}: {e}", self.remote_addr);
                self.abandon();
            }
            Err(e) => {
                error!("Handling request from {}: {e}", self.remote_addr);
                self.close();
            }
        }
    }

    /// Queue raw bytes behind everything already submitted.
    pub fn write(&mut self, bytes: impl Into<Vec<u8>>) {
        self.writer.submit_write(bytes.into());
    }

    /// Close once pending writes drain.
    fn finish(&mut self) {
        self.responses += 1;
        if self.writer.request_close() {
            self.close();
        }
    }

    /// Close once pending writes drain, without a response for this request.
    fn abandon(&mut self) {
        self.request = None;
        if self.writer.request_close() {
            self.close();
        }
    }

    /// Keep the socket for the next request.
    fn reuse(&mut self) {
        self.responses += 1;
        self.request = None;
    }

    fn close(&mut self) {
        if self.writer.close() && self.ctx.debug() {
            debug!("Connection from {} closed", self.remote_addr);
        }
        self.request = None;
    }
}
