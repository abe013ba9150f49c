//! HTTP protocol versions.

use std::fmt;
use std::str::FromStr;

use crate::parser::error::Error;

/// Supported HTTP protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    /// Map the minor version reported by httparse.
    pub(crate) fn from_minor(minor: u8) -> Result<Self, Error> {
        match minor {
            0 => Ok(HttpVersion::Http10),
            1 => Ok(HttpVersion::Http11),
            other => Err(Error::InvalidVersion(format!("HTTP/1.{other}"))),
        }
    }

    /// `(major, minor)` pair.
    pub fn as_tuple(&self) -> (u8, u8) {
        match self {
            HttpVersion::Http10 => (1, 0),
            HttpVersion::Http11 => (1, 1),
        }
    }

    /// Whether persistent connections are the default for this version.
    pub fn keeps_alive_by_default(&self) -> bool {
        *self >= HttpVersion::Http11
    }
}

impl FromStr for HttpVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP/1.0" => Ok(HttpVersion::Http10),
            "HTTP/1.1" => Ok(HttpVersion::Http11),
            _ => Err(Error::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpVersion::Http10 => write!(f, "HTTP/1.0"),
            HttpVersion::Http11 => write!(f, "HTTP/1.1"),
        }
    }
}
