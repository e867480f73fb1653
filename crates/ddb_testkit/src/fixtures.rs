//! Test fixtures and store helpers.
//!
//! Provides convenience functions for setting up test stores
//! and common test scenarios.

use ddb_core::{DocumentStore, StoreConfig};
use ddb_storage::InMemoryBackend;
use std::path::PathBuf;
use tempfile::TempDir;

/// Store configuration for tests: limits large enough for generated
/// documents and a small scan chunk so records straddle read boundaries.
pub fn test_config() -> StoreConfig {
    StoreConfig::new()
        .max_tokens(4096)
        .max_document_size(256 * 1024)
        .scan_chunk_size(64)
}

/// A test store with automatic cleanup.
pub struct TestStore {
    /// The store instance.
    pub store: DocumentStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self::memory_with_config(test_config())
    }

    /// Creates a new in-memory test store with a custom configuration.
    pub fn memory_with_config(config: StoreConfig) -> Self {
        Self {
            store: DocumentStore::open_with_backend(Box::new(InMemoryBackend::new()), config)
                .expect("Failed to open in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test store.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("test.ddb.json");

        let store = DocumentStore::open_with_config(test_config().path(path))
            .expect("Failed to open file store");

        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store file path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_ref()
            .map(|d| d.path().join("test.ddb.json"))
    }

    /// Returns the store file contents.
    pub fn contents(&self) -> Vec<u8> {
        self.store
            .raw_contents()
            .expect("Failed to read store contents")
    }
}

impl std::ops::Deref for TestStore {
    type Target = DocumentStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
///
/// # Example
///
/// ```rust
/// use ddb_testkit::with_temp_store;
///
/// with_temp_store(|store| {
///     store.insert_json(b"{}").unwrap();
/// });
/// ```
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&DocumentStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store.store)
}

/// Runs a test with a temporary file-based store.
pub fn with_file_store<F, R>(f: F) -> R
where
    F: FnOnce(&DocumentStore, &std::path::Path) -> R,
{
    let test_store = TestStore::file();
    let path = test_store.path().expect("File store should have a path");
    f(&test_store.store, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use ddb_core::DocumentId;

    /// Creates a store holding `count` documents `{"n":<i>}`, with
    /// identifiers `1..=count`.
    pub fn populated_store(count: usize) -> TestStore {
        let test_store = TestStore::memory();
        for i in 0..count {
            test_store
                .insert_json(format!("{{\"n\":{i}}}").as_bytes())
                .expect("Failed to insert document");
        }
        test_store
    }

    /// Creates a store where every other document has been deleted,
    /// leaving tombstones and holes throughout the file.
    pub fn fragmented_store(count: usize) -> TestStore {
        let test_store = populated_store(count);
        for id in (1..=count as u64).step_by(2) {
            test_store
                .delete(&DocumentId::new(id).to_string())
                .expect("Failed to delete document");
        }
        test_store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddb_core::DocumentId;

    #[test]
    fn memory_store_starts_empty() {
        let store = TestStore::memory();
        assert_eq!(store.contents(), b"[\n]");
        assert!(store.path().is_none());
    }

    #[test]
    fn file_store_has_path() {
        let store = TestStore::file();
        let path = store.path().unwrap();
        assert!(path.exists());
        store.insert_json(br#"{"a":1}"#).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), store.contents());
    }

    #[test]
    fn with_file_store_passes_path() {
        with_file_store(|store, path| {
            store.insert_json(b"{}").unwrap();
            assert!(std::fs::read_to_string(path).unwrap().contains("_id"));
        });
    }

    #[test]
    fn populated_store_has_sequential_ids() {
        let store = scenarios::populated_store(5);
        for id in 1..=5u64 {
            assert!(store.find(&DocumentId::new(id).to_string()).is_ok());
        }
        assert_eq!(store.stats().unwrap().next_id, Some(DocumentId::new(6)));
    }

    #[test]
    fn fragmented_store_keeps_even_ids() {
        let store = scenarios::fragmented_store(6);
        for id in 1..=6u64 {
            let found = store.find(&DocumentId::new(id).to_string()).is_ok();
            assert_eq!(found, id % 2 == 0);
        }
    }
}
