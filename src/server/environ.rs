//! The per-request environment handed to applications.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::net::SocketAddr;
use log::error;
use serde::de::DeserializeOwned;

use crate::parser::{split_target, HttpVersion, Method};
use crate::server::error::Error;

/// Error sink for applications; every write is logged at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorStream;

impl Write for ErrorStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let message = String::from_utf8_lossy(buf);
        let message = message.trim_end();
        if !message.is_empty() {
            error!("{message}");
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything an application gets to know about one request.
///
/// The request body is fully read before the application runs, so
/// [`input`](Self::input) can be read and repositioned freely.
#[derive(Debug)]
pub struct Environ {
    pub method: Method,
    /// Request target as sent, path and query included.
    pub target: String,
    pub path: String,
    /// Query string without the leading `?`, empty when absent.
    pub query: String,
    pub version: HttpVersion,
    /// Request headers in arrival order, names as sent.
    pub headers: Vec<(String, String)>,
    /// The request body.
    pub input: Cursor<Vec<u8>>,
    /// Application error sink.
    pub errors: ErrorStream,
    pub remote_addr: SocketAddr,
    pub server_addr: SocketAddr,
    /// Always `"http"`; TLS is not terminated here.
    pub url_scheme: &'static str,
    /// Version of the handler contract.
    pub version_tuple: (u8, u8),
    /// Requests may be served from several threads at once. Always false.
    pub multithread: bool,
    /// Requests may be served from several processes at once. Always false.
    pub multiprocess: bool,
    /// The application is invoked only once. Always false.
    pub run_once: bool,
    vars: BTreeMap<String, String>,
}

impl Environ {
    /// Build the environment for one parsed request.
    ///
    /// # Arguments
    ///
    /// * `method` - The request method
    /// * `target` - The raw request target, split here into path and query
    /// * `version` - The HTTP version of the request
    /// * `headers` - The request headers in arrival order
    /// * `body` - The decoded request body
    /// * `remote_addr` - The peer address
    /// * `server_addr` - The local address the request arrived on
    ///
    /// # Returns
    ///
    /// An environment whose string variables are already populated
    pub fn new(
        method: Method,
        target: String,
        version: HttpVersion,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        remote_addr: SocketAddr,
        server_addr: SocketAddr,
    ) -> Self {
        let (path, query) = split_target(&target);
        let (path, query) = (path.to_string(), query.to_string());

        let mut vars = BTreeMap::new();
        vars.insert("REQUEST_METHOD".to_string(), method.to_string());
        vars.insert("SCRIPT_NAME".to_string(), String::new());
        vars.insert("PATH_INFO".to_string(), path.clone());
        vars.insert("QUERY_STRING".to_string(), query.clone());
        vars.insert("REQUEST_URI".to_string(), target.clone());
        vars.insert("SERVER_PROTOCOL".to_string(), version.to_string());
        vars.insert("REMOTE_ADDR".to_string(), remote_addr.ip().to_string());
        vars.insert("REMOTE_PORT".to_string(), remote_addr.port().to_string());
        vars.insert("SERVER_NAME".to_string(), server_addr.ip().to_string());
        vars.insert("SERVER_PORT".to_string(), server_addr.port().to_string());
        for (name, value) in &headers {
            let key = cgi_key(name);
            vars.entry(key)
                .and_modify(|existing: &mut String| {
                    existing.push(',');
                    existing.push_str(value);
                })
                .or_insert_with(|| value.clone());
        }

        Self {
            method,
            target,
            path,
            query,
            version,
            headers,
            input: Cursor::new(body),
            errors: ErrorStream,
            remote_addr,
            server_addr,
            url_scheme: "http",
            version_tuple: (1, 0),
            multithread: false,
            multiprocess: false,
            run_once: false,
            vars,
        }
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// CGI-style variable, e.g. `PATH_INFO` or `HTTP_USER_AGENT`.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// All CGI-style variables.
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// The whole request body, regardless of the input position.
    pub fn body(&self) -> &[u8] {
        self.input.get_ref()
    }

    /// Read the rest of the input from its current position.
    pub fn read_input(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.input.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Decode the request body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(self.body())?)
    }
}

/// `Content-Type` -> `CONTENT_TYPE`, `User-Agent` -> `HTTP_USER_AGENT`.
fn cgi_key(name: &str) -> String {
    let upper = name.to_ascii_uppercase().replace('-', "_");
    match upper.as_str() {
        "CONTENT_TYPE" | "CONTENT_LENGTH" => upper,
        _ => format!("HTTP_{upper}"),
    }
}
