//! Error types for the HTTP parser.

use thiserror::Error;

/// Errors that can occur during HTTP request parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// The request head could not be tokenised.
    #[error("Malformed request: {0}")]
    MalformedRequest(#[from] httparse::Error),

    /// The HTTP method in the request is not supported.
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// The HTTP version in the request is not supported.
    #[error("Invalid HTTP version: {0}")]
    InvalidVersion(String),

    /// A header name or value is not valid text.
    #[error("Invalid header format")]
    InvalidHeaderFormat,

    /// The Content-Length header is missing a usable value or conflicts with another one.
    #[error("Invalid Content-Length: {0}")]
    InvalidContentLength(String),

    /// Chunked body framing is broken.
    #[error("Invalid chunked encoding: {0}")]
    InvalidChunk(&'static str),

    /// More headers than the configured limit.
    #[error("Too many headers (limit {0})")]
    TooManyHeaders(usize),

    /// The request line and headers exceed the configured size.
    #[error("Request head exceeds {0} bytes")]
    HeadTooLarge(usize),

    /// The request body exceeds the configured size.
    #[error("Request body exceeds {0} bytes")]
    BodyTooLarge(usize),

    /// The request was dispatched before its head was parsed.
    #[error("Incomplete request")]
    Incomplete,
}
