//! Store configuration.

use std::path::PathBuf;

/// Default store file name.
pub const DEFAULT_STORE_PATH: &str = "default.ddb.json";

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the store file.
    pub path: PathBuf,

    /// Whether to create the store file if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to sync the file after every mutation (safer but slower).
    pub sync_on_write: bool,

    /// Maximum size of a rendered document in bytes.
    pub max_document_size: usize,

    /// Maximum number of tokens in a request body.
    pub max_tokens: usize,

    /// Size of the positional reads issued while scanning.
    pub scan_chunk_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_STORE_PATH),
            create_if_missing: true,
            sync_on_write: false,
            max_document_size: 10 * 1024,
            max_tokens: 128,
            scan_chunk_size: 8 * 1024,
        }
    }
}

impl StoreConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the store file path.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets whether to create the store file if missing.
    #[must_use]
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync after every mutation.
    #[must_use]
    pub fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the maximum rendered document size.
    #[must_use]
    pub fn max_document_size(mut self, size: usize) -> Self {
        self.max_document_size = size;
        self
    }

    /// Sets the maximum number of tokens per request body.
    #[must_use]
    pub fn max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    /// Sets the scan chunk size. Zero is treated as one byte.
    #[must_use]
    pub fn scan_chunk_size(mut self, size: usize) -> Self {
        self.scan_chunk_size = size.max(1);
        self
    }
}
