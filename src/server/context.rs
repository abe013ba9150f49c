//! State shared by the listener and every connection it accepts.

use std::fmt;

use crate::server::config::ServerConfig;
use crate::server::handler::Application;

/// Configuration and application, built once and passed down explicitly.
pub struct ServerContext {
    pub config: ServerConfig,
    pub app: Box<dyn Application>,
}

impl ServerContext {
    pub fn new(config: ServerConfig, app: impl Application) -> Self {
        Self {
            config,
            app: Box::new(app),
        }
    }

    pub fn debug(&self) -> bool {
        self.config.debug
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
