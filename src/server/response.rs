//! HTTP response types and utilities.

use std::time::SystemTime;
use serde::Serialize;

use crate::parser::HttpVersion;
use crate::server::error::{AppError, ContractViolation, Error};
use crate::server::handler::{body, Body, Responder};

/// Content type used by [`HttpResponse`] unless overridden.
pub const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// HTTP status codes with their standard reason phrases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok = 200,
    Created = 201,
    Accepted = 202,
    NoContent = 204,
    BadRequest = 400,
    Unauthorized = 401,
    Forbidden = 403,
    NotFound = 404,
    MethodNotAllowed = 405,
    InternalServerError = 500,
    NotImplemented = 501,
    BadGateway = 502,
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Get the reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// The numeric code.
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// The status as passed to [`Responder::start`], e.g. `"200 OK"`.
    pub fn as_status_line(&self) -> String {
        format!("{} {}", self.code(), self.reason_phrase())
    }
}

/// Format a timestamp as an HTTP date (`Thu, 01 Jan 1970 00:00:00 GMT`).
pub fn http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Split `"<code> <reason>"` into its parts.
pub(crate) fn parse_status(status: &str) -> Result<(u16, &str), ContractViolation> {
    let (code, reason) = status.split_once(' ').unwrap_or((status, ""));
    if code.len() != 3 {
        return Err(ContractViolation::InvalidStatus(status.to_string()));
    }
    let code: u16 = code
        .parse()
        .map_err(|_| ContractViolation::InvalidStatus(status.to_string()))?;
    if !(100..=999).contains(&code) {
        return Err(ContractViolation::InvalidStatus(status.to_string()));
    }
    Ok((code, reason))
}

/// Serialized status line and headers.
#[derive(Debug)]
pub(crate) struct HeaderBlock {
    pub bytes: Vec<u8>,
    pub has_content_length: bool,
}

/// Assemble the status line and headers, adding `Server` and `Date` when
/// the application did not supply them.
pub(crate) fn header_block(
    version: HttpVersion,
    status: &str,
    headers: &[(String, String)],
    server_name: &str,
    now: SystemTime,
) -> Result<HeaderBlock, ContractViolation> {
    let (code, reason) = parse_status(status)?;

    let mut bytes = Vec::with_capacity(256);
    bytes.extend_from_slice(format!("{version} {code} {reason}\r\n").as_bytes());

    let mut has_content_length = false;
    let mut has_server = false;
    let mut has_date = false;
    for (name, value) in headers {
        bytes.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        has_content_length |= name.eq_ignore_ascii_case("Content-Length");
        has_server |= name.eq_ignore_ascii_case("Server");
        has_date |= name.eq_ignore_ascii_case("Date");
    }
    if !has_server {
        bytes.extend_from_slice(format!("Server: {server_name}\r\n").as_bytes());
    }
    if !has_date {
        bytes.extend_from_slice(format!("Date: {}\r\n", http_date(now)).as_bytes());
    }
    bytes.extend_from_slice(b"\r\n");

    Ok(HeaderBlock { bytes, has_content_length })
}

/// A complete, buffered response for handlers that do not stream.
///
/// ```
/// use microgate::{HttpResponse, StatusCode};
///
/// let response = HttpResponse::new(StatusCode::Ok).with_body_string("hello world!");
/// assert_eq!(response.get_header("Content-Length"), Some("12"));
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// The HTTP status code
    pub status: StatusCode,
    /// The HTTP headers, in send order
    pub headers: Vec<(String, String)>,
    /// The response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a new HTTP response with the given status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), DEFAULT_CONTENT_TYPE.to_string())],
            body: Vec::new(),
        }
    }

    /// Set the response body with a string.
    pub fn with_body_string(self, body: impl Into<String>) -> Self {
        let body: String = body.into();
        self.with_body_bytes(body.into_bytes())
    }

    /// Set the response body with bytes.
    pub fn with_body_bytes(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        let content_length = self.body.len().to_string();
        self.with_header("Content-Length", content_length)
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&name)) {
            Some(existing) => existing.1 = value,
            None => self.headers.push((name, value)),
        }
        self
    }

    /// Set the content type.
    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    /// Set the response body with a JSON value.
    pub fn with_json<T: Serialize>(self, value: &T) -> Result<Self, Error> {
        let json = serde_json::to_vec(value).map_err(Error::JsonError)?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body_bytes(json))
    }

    /// Case-insensitive header lookup.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Start the response on `responder` and hand back the body.
    ///
    /// A `Content-Length` header is added when missing so the connection
    /// can be kept alive.
    pub fn respond(self, responder: &mut Responder<'_>) -> Result<Body, AppError> {
        let response = if self.get_header("Content-Length").is_none() {
            let length = self.body.len().to_string();
            self.with_header("Content-Length", length)
        } else {
            self
        };
        responder.start(response.status.as_status_line(), response.headers)?;
        Ok(body::once(response.body))
    }
}

impl From<&str> for HttpResponse {
    fn from(body: &str) -> Self {
        HttpResponse::new(StatusCode::Ok).with_body_string(body)
    }
}

impl From<String> for HttpResponse {
    fn from(body: String) -> Self {
        HttpResponse::new(StatusCode::Ok).with_body_string(body)
    }
}
