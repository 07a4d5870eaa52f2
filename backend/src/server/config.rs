//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use laff::settings::LaffSettings;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) timeout: Duration,
    pub(crate) limit: u32,
}

impl ServerConfig {
    /// Construct a server configuration.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            timeout: Duration::from_secs(30),
            limit: 10,
        }
    }

    /// Client request and graceful shutdown timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Inbound requests allowed per second.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}

impl From<&LaffSettings> for ServerConfig {
    fn from(settings: &LaffSettings) -> Self {
        Self::new(settings.bind_addr())
            .with_timeout(settings.timeout())
            .with_limit(settings.limit())
    }
}
