//! Server configuration.

use ddb_core::StoreConfig;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default upper bound on a request body.
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Largest accepted request body in bytes.
    pub max_body_size: usize,
    /// Configuration of the store the server opens.
    pub store: StoreConfig,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            store: StoreConfig::default(),
        }
    }

    /// Sets the bind address.
    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Sets the maximum request body size.
    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Replaces the store configuration.
    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Sets the store file path.
    #[must_use]
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store = self.store.path(path);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], 8080)))
    }
}
