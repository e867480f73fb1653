//! # DDB Storage
//!
//! Storage backend trait and implementations for DDB.
//!
//! This crate provides the lowest-level storage abstraction for DDB.
//! Storage backends are **opaque byte stores** - they do not interpret
//! the data they store. The JSON array layout of the store file is owned
//! entirely by `ddb_core`.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (positional read, positional write,
//!   append, truncate, flush)
//! - No knowledge of records, documents or JSON
//! - Must be `Send + Sync` for concurrent access
//! - Every write is bounds-checked against the current size
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use ddb_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.append(b"[\n]").unwrap();
//! backend.write_at(1, b"\n{}\n]").unwrap();
//! assert_eq!(backend.data(), b"[\n{}\n]");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
