//! HTTP server implementation for microgate.
//!
//! A listener accepts connections and each connection serves one request at
//! a time, handing it to a synchronous [`Application`]. Response bytes are
//! queued on a per-connection writer so the handler never waits on the
//! socket.

mod response;
mod config;
mod error;
mod handler;
mod environ;
mod writer;
mod request_context;
mod context;
mod connection;
mod registry;
mod http_server;

// Re-export public items
pub use response::{http_date, HttpResponse, StatusCode, DEFAULT_CONTENT_TYPE};
pub use config::{BindTarget, ServerConfig};
pub use error::{AppError, ContractViolation, Error};
pub use handler::{body, from_fn, Application, Body, Responder, Writer};
pub use environ::{Environ, ErrorStream};
pub use writer::ResponseWriter;
pub use request_context::{Disposition, RequestContext};
pub use context::ServerContext;
pub use connection::Connection;
pub use registry::{ConnectionId, Registry};
pub use http_server::HttpServer;
