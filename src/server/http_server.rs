//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tokio::sync::Notify;
use tokio::task::{JoinHandle, JoinSet};

use crate::server::config::{BindTarget, ServerConfig};
use crate::server::connection::Connection;
use crate::server::context::ServerContext;
use crate::server::error::Error;
use crate::server::handler::Application;
use crate::server::registry::Registry;

/// An HTTP server.
///
/// Cloning yields another handle to the same server, which is how a
/// running server is stopped from elsewhere.
#[derive(Clone)]
pub struct HttpServer {
    ctx: Arc<ServerContext>,
    registry: Arc<Registry>,
    shutdown: Arc<Notify>,
    stopped: Arc<AtomicBool>,
    local_addr: Arc<OnceLock<SocketAddr>>,
}

impl HttpServer {
    /// Create a new HTTP server.
    ///
    /// # Arguments
    ///
    /// * `config` - Bind target, limits and behaviour switches
    /// * `app` - The application invoked once per request
    ///
    /// # Returns
    ///
    /// A server that is not listening yet; call [`start`](Self::start) or
    /// [`run_blocking`](Self::run_blocking) to serve
    pub fn new(config: ServerConfig, app: impl Application) -> Self {
        Self {
            ctx: Arc::new(ServerContext::new(config, app)),
            registry: Arc::new(Registry::new()),
            shutdown: Arc::new(Notify::new()),
            stopped: Arc::new(AtomicBool::new(false)),
            local_addr: Arc::new(OnceLock::new()),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.ctx.config
    }

    /// The bound address, once [`start`](Self::start) is listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Number of connections not yet released.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Stop accepting and close every live connection.
    ///
    /// Connections still flush what they already queued. Safe to call more
    /// than once and before [`start`](Self::start).
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Shutting down server...");
        self.shutdown.notify_one();
        self.registry.close_all();
    }

    /// Build a single-threaded runtime and serve until stopped.
    pub fn run_blocking(self) -> Result<(), Error> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.start())
    }

    /// Set up the TCP listener.
    async fn setup_listener(&self) -> Result<TcpListener, Error> {
        let listener = match self.ctx.config.bind {
            BindTarget::Addr(addr) => TcpListener::bind(addr).await?,
            BindTarget::Fd(fd) => adopt_listener(fd)?,
        };
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);
        info!("Server listening on http://{addr}");
        Ok(listener)
    }

    /// Stop the server on Ctrl+C or SIGTERM.
    fn setup_signal_handler(&self) -> JoinHandle<()> {
        let server = self.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            info!("Received shutdown signal, initiating graceful shutdown");
            server.stop();
        })
    }

    /// Wrap an accepted socket and spawn its read loop.
    fn handle_new_connection(
        &self,
        socket: TcpStream,
        remote_addr: SocketAddr,
        server_addr: SocketAddr,
        tasks: &mut JoinSet<usize>,
    ) {
        let connection = Connection::new(
            socket,
            remote_addr,
            server_addr,
            Arc::clone(&self.ctx),
            Arc::clone(&self.registry),
        );
        tasks.spawn(connection.run());
    }

    /// Wait for every connection to release its socket.
    async fn perform_shutdown(&self, tasks: &mut JoinSet<usize>) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let shutdown_timeout = tokio::time::Duration::from_secs(self.ctx.config.shutdown_timeout_secs);
        let drained = tokio::time::timeout(shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("{len} connections still open after {shutdown_timeout:?}, aborting", len = tasks.len());
            tasks.shutdown().await;
        }
    }

    /// Start the server and listen for incoming connections.
    ///
    /// Returns after [`stop`](Self::stop) once the connections are released.
    pub async fn start(&self) -> Result<(), Error> {
        let listener = self.setup_listener().await?;
        let server_addr = listener.local_addr()?;

        let signals = self.setup_signal_handler();
        let mut tasks = JoinSet::new();

        while !self.is_stopped() {
            tokio::select! {
                biased;

                () = self.shutdown.notified() => break,

                accept_result = listener.accept() => match accept_result {
                    Ok((socket, addr)) => self.handle_new_connection(socket, addr, server_addr, &mut tasks),
                    // The loop keeps accepting after a failed accept.
                    Err(e) => error!("Error accepting connection: {e}"),
                },

                Some(res) = tasks.join_next(), if !tasks.is_empty() => match res {
                    Ok(responses) => {
                        if self.ctx.debug() {
                            debug!("Connection released after {responses} responses");
                        }
                    }
                    Err(e) => error!("Connection task failed: {e}"),
                },
            }
        }

        drop(listener);
        // Covers a connection accepted in the same turn as the stop.
        self.registry.close_all();
        self.perform_shutdown(&mut tasks).await;
        signals.abort();

        info!("Server shutdown complete");
        Ok(())
    }
}

/// Take over an inherited listening descriptor.
#[cfg(unix)]
fn adopt_listener(fd: i32) -> Result<TcpListener, Error> {
    use std::os::fd::BorrowedFd;

    // SAFETY: the descriptor was handed to this process open and listening;
    // it is only borrowed long enough to be duplicated.
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let listener = std::net::TcpListener::from(borrowed.try_clone_to_owned()?);
    listener.set_nonblocking(true)?;
    Ok(TcpListener::from_std(listener)?)
}

#[cfg(not(unix))]
fn adopt_listener(fd: i32) -> Result<TcpListener, Error> {
    Err(Error::ConfigError(format!(
        "cannot adopt file descriptor {fd} on this platform"
    )))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Error setting up Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Error setting up SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
