//! The application contract.
//!
//! An application receives the request [`Environ`] and a [`Responder`]. It
//! starts the response exactly once with a status and headers, and returns
//! a [`Body`]: a lazy, single-pass sequence of byte chunks that the server
//! writes out in order.
//!
//! ```
//! use microgate::{body, AppError, Body, Environ, Responder};
//!
//! fn hello(_environ: &mut Environ, responder: &mut Responder<'_>) -> Result<Body, AppError> {
//!     responder.start("200 OK", vec![
//!         ("Content-Type".to_string(), "text/plain".to_string()),
//!         ("Content-Length".to_string(), "5".to_string()),
//!     ])?;
//!     Ok(body::once("hello"))
//! }
//! ```

use std::time::SystemTime;

use crate::parser::HttpVersion;
use crate::server::environ::Environ;
use crate::server::error::{AppError, ContractViolation};
use crate::server::response::{header_block, parse_status};
use crate::server::writer::ResponseWriter;

/// Response body produced by an application.
///
/// Each item is one chunk to write. An `Err` item ends the body early; the
/// connection is then closed after what was already written.
///
/// The body is drained in one go and every chunk is queued for the socket
/// without a limit. A large body is therefore held in memory until the
/// client has read it; stream very large payloads from a smaller source or
/// bound them with `Content-Length` checks in the application.
pub type Body = Box<dyn Iterator<Item = Result<Vec<u8>, AppError>>>;

/// Constructors for common bodies.
pub mod body {
    use super::Body;

    /// A body without any chunks.
    pub fn empty() -> Body {
        Box::new(std::iter::empty())
    }

    /// A body made of a single chunk.
    pub fn once(chunk: impl Into<Vec<u8>>) -> Body {
        Box::new(std::iter::once(Ok(chunk.into())))
    }

    /// A body made of the given chunks, in order.
    pub fn from_chunks<I>(chunks: I) -> Body
    where
        I: IntoIterator<Item = Vec<u8>>,
        I::IntoIter: 'static,
    {
        Box::new(chunks.into_iter().map(Ok))
    }
}

/// A request-handling application.
pub trait Application: Send + Sync + 'static {
    /// Handle one request.
    fn call(&self, environ: &mut Environ, responder: &mut Responder<'_>) -> Result<Body, AppError>;
}

impl<F> Application for F
where
    F: Fn(&mut Environ, &mut Responder<'_>) -> Result<Body, AppError> + Send + Sync + 'static,
{
    fn call(&self, environ: &mut Environ, responder: &mut Responder<'_>) -> Result<Body, AppError> {
        self(environ, responder)
    }
}

/// Pin a closure to the [`Application`] signature so its argument types
/// are inferred.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&mut Environ, &mut Responder<'_>) -> Result<Body, AppError> + Send + Sync + 'static,
{
    f
}

/// Status and headers set by the application, not yet on the wire.
#[derive(Debug, Clone)]
struct PendingHead {
    status: String,
    code: u16,
    headers: Vec<(String, String)>,
}

/// Starts the response and writes body bytes for one request.
pub struct Responder<'a> {
    writer: &'a mut ResponseWriter,
    version: HttpVersion,
    server_name: &'a str,
    head: Option<PendingHead>,
    headers_sent: bool,
    missing_content_length: bool,
    violation: Option<ContractViolation>,
}

/// Write handle returned by [`Responder::start`].
pub struct Writer<'r, 'a> {
    responder: &'r mut Responder<'a>,
}

impl Writer<'_, '_> {
    /// Write body bytes; see [`Responder::write`].
    pub fn write(&mut self, data: &[u8]) -> Result<(), ContractViolation> {
        self.responder.write(data)
    }
}

impl<'a> Responder<'a> {
    pub(crate) fn new(writer: &'a mut ResponseWriter, version: HttpVersion, server_name: &'a str) -> Self {
        Self {
            writer,
            version,
            server_name,
            head: None,
            headers_sent: false,
            missing_content_length: false,
            violation: None,
        }
    }

    /// Set the response status (`"200 OK"`) and headers.
    ///
    /// Nothing is sent until the first body write. Starting twice is a
    /// contract violation and fails the request even if the error is
    /// ignored by the caller.
    pub fn start(
        &mut self,
        status: impl Into<String>,
        headers: Vec<(String, String)>,
    ) -> Result<Writer<'_, 'a>, ContractViolation> {
        if self.head.is_some() {
            return Err(self.record(ContractViolation::AlreadyStarted));
        }
        self.set_head(status.into(), headers)?;
        Ok(Writer { responder: self })
    }

    /// Start, or restart, the response after a failure.
    ///
    /// Replaces status and headers that were set but not yet sent. Once the
    /// header block is on the wire the failure can no longer be reported and
    /// is handed back as [`ContractViolation::HeadersAlreadySent`].
    pub fn start_with_failure(
        &mut self,
        status: impl Into<String>,
        headers: Vec<(String, String)>,
        failure: &(dyn std::error::Error + 'static),
    ) -> Result<Writer<'_, 'a>, ContractViolation> {
        if self.headers_sent {
            return Err(ContractViolation::HeadersAlreadySent(failure.to_string()));
        }
        self.set_head(status.into(), headers)?;
        Ok(Writer { responder: self })
    }

    /// Write body bytes.
    ///
    /// The first write, empty or not, sends the status line and headers.
    pub fn write(&mut self, data: &[u8]) -> Result<(), ContractViolation> {
        let Some(head) = &self.head else {
            return Err(self.record(ContractViolation::WriteBeforeStart));
        };
        if !self.headers_sent {
            let block = header_block(self.version, &head.status, &head.headers, self.server_name, SystemTime::now())?;
            self.missing_content_length = !block.has_content_length;
            self.headers_sent = true;
            self.writer.submit_write(block.bytes);
        }
        if !data.is_empty() {
            self.writer.submit_write(data.to_vec());
        }
        Ok(())
    }

    /// Whether [`start`](Self::start) has been called.
    pub fn is_started(&self) -> bool {
        self.head.is_some()
    }

    /// Whether the header block has been submitted.
    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Numeric status of the started response.
    pub fn status_code(&self) -> Option<u16> {
        self.head.as_ref().map(|head| head.code)
    }

    /// The sent headers lacked `Content-Length`.
    pub(crate) fn missing_content_length(&self) -> bool {
        self.missing_content_length
    }

    /// First contract violation seen for this request.
    pub(crate) fn take_violation(&mut self) -> Option<ContractViolation> {
        self.violation.take()
    }

    fn set_head(&mut self, status: String, headers: Vec<(String, String)>) -> Result<(), ContractViolation> {
        let code = match parse_status(&status) {
            Ok((code, _)) => code,
            Err(violation) => return Err(self.record(violation)),
        };
        self.head = Some(PendingHead { status, code, headers });
        Ok(())
    }

    fn record(&mut self, violation: ContractViolation) -> ContractViolation {
        if self.violation.is_none() {
            self.violation = Some(violation.clone());
        }
        violation
    }
}
