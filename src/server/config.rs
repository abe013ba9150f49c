//! Server configuration.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::parser::ParseLimits;
use crate::server::error::Error;

fn default_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8088))
}

/// Where the listening socket comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindTarget {
    /// Bind a fresh socket to this address.
    Addr(SocketAddr),
    /// Adopt an already-listening file descriptor.
    Fd(i32),
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The listening socket.
    pub bind: BindTarget,
    /// Send diagnostic 500 responses and log per-connection events.
    pub debug: bool,
    /// The read buffer size.
    pub read_buffer_size: usize,
    /// Maximum number of request headers.
    pub max_headers: usize,
    /// Maximum size of the request line and headers.
    pub max_head_size: usize,
    /// Maximum size of a request body.
    pub max_body_size: usize,
    /// Value of the `Server` header added to responses that lack one.
    pub server_name: String,
    /// Seconds to wait for connections to release after a stop.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let limits = ParseLimits::default();
        Self {
            bind: BindTarget::Addr(default_addr()),
            debug: false,
            read_buffer_size: 64 * 1024,
            max_headers: limits.max_headers,
            max_head_size: limits.max_head_size,
            max_body_size: limits.max_body_size,
            server_name: format!("microgate/{}", env!("CARGO_PKG_VERSION")),
            shutdown_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    /// Parse a configuration from JSON. Missing fields keep their defaults.
    ///
    /// # Arguments
    ///
    /// * `json` - A JSON object with any subset of the configuration fields
    ///
    /// # Returns
    ///
    /// The validated configuration, a `JsonError` for malformed input or a
    /// `ConfigError` for values that fail validation
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Apply `MICROGATE_*` environment overrides.
    ///
    /// `MICROGATE_DEBUG` enables debug mode when set to any value.
    /// `MICROGATE_INTERFACE` and `MICROGATE_PORT` replace parts of the bind
    /// address, `MICROGATE_FD` switches to an inherited descriptor.
    pub fn with_env_overrides(self) -> Result<Self, Error> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        if var("MICROGATE_DEBUG").is_some() {
            self.debug = true;
        }

        let interface = var("MICROGATE_INTERFACE");
        let port = var("MICROGATE_PORT");
        if interface.is_some() || port.is_some() {
            let mut addr = match self.bind {
                BindTarget::Addr(addr) => addr,
                BindTarget::Fd(_) => default_addr(),
            };
            if let Some(interface) = interface {
                let ip: IpAddr = interface
                    .parse()
                    .map_err(|_| Error::ConfigError(format!("invalid interface {interface:?}")))?;
                addr.set_ip(ip);
            }
            if let Some(port) = port {
                let port: u16 = port
                    .parse()
                    .map_err(|_| Error::ConfigError(format!("invalid port {port:?}")))?;
                addr.set_port(port);
            }
            self.bind = BindTarget::Addr(addr);
        }

        if let Some(fd) = var("MICROGATE_FD") {
            let fd: i32 = fd
                .parse()
                .map_err(|_| Error::ConfigError(format!("invalid file descriptor {fd:?}")))?;
            self.bind = BindTarget::Fd(fd);
        }

        self.validate()?;
        Ok(self)
    }

    /// The address to bind, unless a descriptor is adopted.
    pub fn listen_addr(&self) -> Option<SocketAddr> {
        match self.bind {
            BindTarget::Addr(addr) => Some(addr),
            BindTarget::Fd(_) => None,
        }
    }

    /// Parser limits derived from this configuration.
    pub fn parse_limits(&self) -> ParseLimits {
        ParseLimits {
            max_headers: self.max_headers,
            max_head_size: self.max_head_size,
            max_body_size: self.max_body_size,
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.read_buffer_size == 0 {
            return Err(Error::ConfigError("read_buffer_size must be positive".to_string()));
        }
        if self.max_headers == 0 {
            return Err(Error::ConfigError("max_headers must be positive".to_string()));
        }
        if let BindTarget::Fd(fd) = self.bind {
            if fd < 0 {
                return Err(Error::ConfigError(format!("invalid file descriptor {fd}")));
            }
        }
        Ok(())
    }
}
