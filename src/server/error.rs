//! Error types for the HTTP server.

use thiserror::Error;

use crate::parser::Error as ParserError;

/// Error raised by an application handler.
pub type AppError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Misuse of the response-start contract by an application.
///
/// These indicate a broken handler rather than a transient condition and
/// are never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// The response was started twice for one request.
    #[error("response already started")]
    AlreadyStarted,

    /// Body bytes were written before the response was started.
    #[error("write() before start()")]
    WriteBeforeStart,

    /// The handler returned without starting the response.
    #[error("handler returned without starting the response")]
    NeverStarted,

    /// A failure was reported after the header block went out.
    #[error("response headers already sent: {0}")]
    HeadersAlreadySent(String),

    /// The status is not of the form `"<code> <reason>"`.
    #[error("invalid status {0:?}")]
    InvalidStatus(String),
}

/// Errors that can occur during HTTP server operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket read, write or accept failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The request bytes could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(#[from] ParserError),

    /// The parser stopped short of the bytes it was given.
    #[error("Parse error: parser consumed {consumed} of {received} bytes")]
    ShortConsume { consumed: usize, received: usize },

    /// The application handler failed and no diagnostic response was sent.
    #[error("Application error: {0}")]
    ApplicationFault(#[source] AppError),

    /// The application broke the response-start contract.
    #[error("Contract violation: {0}")]
    ContractViolation(#[from] ContractViolation),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl Error {
    /// Whether the connection must be closed without a response.
    pub fn is_fatal_to_connection(&self) -> bool {
        matches!(
            self,
            Error::ParseError(_) | Error::ShortConsume { .. } | Error::ContractViolation(_)
        )
    }

    /// Whether this error points at a broken application.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::ContractViolation(_))
    }

    /// Whether the application itself failed while handling a request.
    ///
    /// The request was read in full, so the connection may still flush
    /// earlier responses before closing.
    pub fn is_application_fault(&self) -> bool {
        matches!(self, Error::ApplicationFault(_))
    }
}
