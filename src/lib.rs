//! A small HTTP/1.x server for synchronous request handlers.
//!
//! Connections are served by an event loop; each request is handed to an
//! [`Application`] which starts the response with a status and headers and
//! returns the body as an iterator of byte chunks.
//!
//! # Features
//!
//! - Incremental request parsing, tolerant of arbitrary fragmentation
//! - HTTP/1.0 and HTTP/1.1 with keep-alive
//! - Bodies delimited by `Content-Length` or chunked transfer encoding
//! - `Server` and `Date` headers added when the application omits them
//! - Ordered response writes with deferred close; chunks are queued without
//!   a limit, so the event loop never waits on a slow client
//! - Graceful shutdown on [`HttpServer::stop`], Ctrl+C or SIGTERM
//! - JSON configuration with environment overrides
//!
//! # Examples
//!
//! ## Serving an application
//!
//! ```no_run
//! use microgate::{from_fn, HttpResponse, HttpServer, ServerConfig};
//!
//! let app = from_fn(|_environ, responder| {
//!     HttpResponse::from("hello world!").respond(responder)
//! });
//!
//! let config = ServerConfig::default().with_env_overrides()?;
//! HttpServer::new(config, app).run_blocking()?;
//! # Ok::<(), microgate::ServerError>(())
//! ```
//!
//! ## Reading the request
//!
//! ```
//! use microgate::{body, AppError, Body, Environ, Responder};
//!
//! fn echo(environ: &mut Environ, responder: &mut Responder<'_>) -> Result<Body, AppError> {
//!     let input = environ.read_input()?;
//!     let content_type = environ
//!         .var("CONTENT_TYPE")
//!         .unwrap_or("application/octet-stream")
//!         .to_string();
//!     responder.start("200 OK", vec![
//!         ("Content-Type".to_string(), content_type),
//!         ("Content-Length".to_string(), input.len().to_string()),
//!     ])?;
//!     Ok(body::once(input))
//! }
//! ```
//!
//! ## Parsing a request
//!
//! ```
//! use microgate::{Method, RequestParser};
//!
//! let mut parser = RequestParser::default();
//! let consumed = parser.feed(b"POST /echo HTTP/1.1\r\nHost: example.com\r\nContent-Le").unwrap();
//! assert_eq!(consumed, 50);
//! assert!(!parser.headers_complete());
//!
//! parser.feed(b"ngth: 2\r\n\r\nhi").unwrap();
//! assert!(parser.message_complete());
//! assert_eq!(parser.method(), Some(Method::POST));
//! assert_eq!(parser.header("content-length"), Some("2"));
//! assert_eq!(parser.take_body(), b"hi");
//! ```

// Export the parser module
pub mod parser;

// Export the server module
pub mod server;

// Re-export commonly used items for convenience
pub use parser::{Error as ParserError, HttpVersion, Method, ParseLimits, RequestParser};
pub use server::{
    body, from_fn, http_date, AppError, Application, BindTarget, Body, Connection, ConnectionId, ContractViolation,
    Disposition, Environ, Error as ServerError, ErrorStream, HttpResponse, HttpServer, Registry,
    RequestContext, Responder, ResponseWriter, ServerConfig, ServerContext, StatusCode, Writer,
};
