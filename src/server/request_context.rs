//! One request/response exchange on a connection.

use std::net::SocketAddr;
use log::{error, info, warn};

use crate::parser::{Error as ParserError, Method, RequestParser};
use crate::server::context::ServerContext;
use crate::server::environ::Environ;
use crate::server::error::{ContractViolation, Error};
use crate::server::handler::{body, Body, Responder};
use crate::server::writer::ResponseWriter;

/// What the connection does once a response has been dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the connection for the next request.
    Reuse,
    /// Close the connection once pending writes drain.
    Finish,
}

/// Parsing state and dispatch for one request.
///
/// A fresh context (and parser) is created for every request on a
/// connection.
#[derive(Debug)]
pub struct RequestContext {
    parser: RequestParser,
    remote_addr: SocketAddr,
    server_addr: SocketAddr,
    headers_seen: bool,
    close_after_response: bool,
}

impl RequestContext {
    pub fn new(parser: RequestParser, remote_addr: SocketAddr, server_addr: SocketAddr) -> Self {
        Self {
            parser,
            remote_addr,
            server_addr,
            headers_seen: false,
            close_after_response: false,
        }
    }

    /// Feed bytes read from the socket.
    ///
    /// Returns `Ok(None)` while the request is incomplete and the
    /// connection's next step once the response has been dispatched. Parse
    /// errors, contract violations and unreported application faults are
    /// returned as errors; the caller closes the connection without a
    /// response.
    pub fn feed(
        &mut self,
        data: &[u8],
        writer: &mut ResponseWriter,
        ctx: &ServerContext,
    ) -> Result<Option<Disposition>, Error> {
        let consumed = self.parser.feed(data)?;
        if consumed != data.len() {
            return Err(Error::ShortConsume { consumed, received: data.len() });
        }

        if self.parser.headers_complete() && !self.headers_seen {
            self.headers_seen = true;
            if !self.parser.should_keep_alive() {
                self.force_close();
            }
        }

        if !self.parser.message_complete() {
            return Ok(None);
        }
        self.dispatch(writer, ctx).map(Some)
    }

    /// Whether the connection closes after this response.
    pub fn close_after_response(&self) -> bool {
        self.close_after_response
    }

    // Only ever narrows the decision towards closing.
    fn force_close(&mut self) {
        self.close_after_response = true;
    }

    fn dispatch(&mut self, writer: &mut ResponseWriter, ctx: &ServerContext) -> Result<Disposition, Error> {
        let (Some(method), Some(target), Some(version)) =
            (self.parser.method(), self.parser.target(), self.parser.version())
        else {
            return Err(ParserError::Incomplete.into());
        };
        let target = target.to_string();
        let body = self.parser.take_body();
        let mut environ = Environ::new(
            method,
            target.clone(),
            version,
            self.parser.headers().to_vec(),
            body,
            self.remote_addr,
            self.server_addr,
        );

        let mut responder = Responder::new(writer, version, &ctx.config.server_name);
        let outcome = ctx.app.call(&mut environ, &mut responder);
        if let Some(violation) = responder.take_violation() {
            return Err(violation.into());
        }

        let mut chunks: Body = match outcome {
            Ok(chunks) => chunks,
            Err(err) => recover(Error::ApplicationFault(err), &mut responder, ctx.debug())?,
        };
        if !responder.is_started() {
            return Err(ContractViolation::NeverStarted.into());
        }

        loop {
            match chunks.next() {
                None => break,
                Some(Ok(bytes)) => responder.write(&bytes)?,
                Some(Err(err)) if !responder.headers_sent() => {
                    chunks = recover(Error::ApplicationFault(err), &mut responder, ctx.debug())?;
                }
                Some(Err(err)) => {
                    // Headers are on the wire; the client sees a short body.
                    error!("{} after headers were sent", Error::ApplicationFault(err));
                    self.force_close();
                    break;
                }
            }
        }
        drop(chunks);

        if !responder.headers_sent() {
            responder.write(b"")?;
        }
        if let Some(violation) = responder.take_violation() {
            return Err(violation.into());
        }
        if responder.missing_content_length() {
            self.force_close();
        }

        if ctx.debug() {
            if let Some(code) = responder.status_code() {
                log_access(code, method, &target, self.remote_addr);
            }
        }

        Ok(self.end())
    }

    fn end(&self) -> Disposition {
        if self.close_after_response {
            Disposition::Finish
        } else {
            Disposition::Reuse
        }
    }
}

/// Turn an application fault into a diagnostic 500 in debug mode.
///
/// Outside debug mode, or when the failure can no longer be reported, the
/// fault is handed back and the connection closes without a response.
fn recover(fault: Error, responder: &mut Responder<'_>, debug: bool) -> Result<Body, Error> {
    let Error::ApplicationFault(err) = &fault else {
        return Err(fault);
    };
    if !debug {
        return Err(fault);
    }
    error!("{fault}");
    let detail = failure_detail(&**err);
    let headers = vec![
        ("Content-Type".to_string(), "text/plain".to_string()),
        ("Content-Length".to_string(), detail.len().to_string()),
    ];
    match responder.start_with_failure("500 Internal Server Error", headers, &**err) {
        Ok(_) => Ok(body::once(detail)),
        Err(e) => {
            error!("Cannot report application failure: {e}");
            Err(fault)
        }
    }
}

fn failure_detail(err: &(dyn std::error::Error + 'static)) -> String {
    let mut detail = format!("{err}\n");
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(&format!("caused by: {cause}\n"));
        source = cause.source();
    }
    detail
}

fn log_access(code: u16, method: Method, target: &str, remote_addr: SocketAddr) {
    if code < 400 {
        info!("{code} {method} {target} {remote_addr}");
    } else if code < 500 {
        warn!("{code} {method} {target} {remote_addr}");
    } else {
        error!("{code} {method} {target} {remote_addr}");
    }
}
