//! In-memory storage backend for testing.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;

/// A store file held in a byte vector.
///
/// Tests use it to assert the exact bytes a store would have written, and
/// compaction dry runs use it as a scratch copy of the real file.
///
/// # Example
///
/// ```rust
/// use ddb_storage::{StorageBackend, InMemoryBackend};
///
/// let mut backend = InMemoryBackend::with_data(b"[\n]".to_vec());
/// assert_eq!(backend.size().unwrap(), 3);
/// backend.truncate(1).unwrap();
/// assert_eq!(backend.data(), b"[");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<Vec<u8>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding `data`, such as a hand-written store file.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let offset_usize = offset as usize;
        let end = offset_usize.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[offset_usize..end].to_vec())
    }

    fn write_at(&mut self, offset: u64, new_data: &[u8]) -> StorageResult<()> {
        let mut data = self.data.write();
        let size = data.len() as u64;

        if offset > size {
            return Err(StorageError::WritePastEnd { offset, size });
        }

        let start = offset as usize;
        let overlap = new_data.len().min(data.len() - start);
        data[start..start + overlap].copy_from_slice(&new_data[..overlap]);
        data.extend_from_slice(&new_data[overlap..]);
        Ok(())
    }

    fn append(&mut self, new_data: &[u8]) -> StorageResult<u64> {
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(new_data);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let mut data = self.data.write();
        let current_size = data.len() as u64;

        if new_size > current_size {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("cannot truncate to {new_size} bytes, store holds {current_size}"),
            )));
        }

        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn read_past_end_fails() {
        let backend = InMemoryBackend::with_data(b"hello".to_vec());

        let result = backend.read_at(10, 5);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));

        let result = backend.read_at(3, 10);
        assert!(matches!(result, Err(StorageError::ReadPastEnd { .. })));
    }

    #[test]
    fn memory_write_at_patches_single_byte() {
        let mut backend = InMemoryBackend::with_data(br#"[{"s":1}]"#.to_vec());
        backend.write_at(6, b"0").unwrap();
        assert_eq!(backend.data(), br#"[{"s":0}]"#);
    }

    #[test]
    fn memory_write_at_straddles_end() {
        let mut backend = InMemoryBackend::with_data(b"[\n]".to_vec());
        backend.write_at(1, b"\n{}\n]").unwrap();
        assert_eq!(backend.data(), b"[\n{}\n]");
    }

    #[test]
    fn memory_write_at_end_appends() {
        let mut backend = InMemoryBackend::with_data(b"[".to_vec());
        backend.write_at(1, b"\n]").unwrap();
        assert_eq!(backend.data(), b"[\n]");
    }

    #[test]
    fn memory_write_past_end_fails() {
        let mut backend = InMemoryBackend::with_data(b"[".to_vec());
        let result = backend.write_at(2, b"]");
        assert!(matches!(result, Err(StorageError::WritePastEnd { offset: 2, size: 1 })));
        assert_eq!(backend.data(), b"[");
    }

    #[test]
    fn truncate_cuts_array_tail() {
        let mut backend = InMemoryBackend::with_data(b"[\n{},\n{}\n]".to_vec());
        backend.truncate(4).unwrap();
        assert_eq!(backend.data(), b"[\n{}");
        assert!(backend.truncate(100).is_err());
    }

    proptest! {
        #[test]
        fn write_at_matches_vec_splice(
            initial in prop::collection::vec(any::<u8>(), 0..64),
            patch in prop::collection::vec(any::<u8>(), 0..64),
            at in 0usize..64,
        ) {
            let offset = at.min(initial.len());
            let mut expected = initial.clone();
            let overlap = patch.len().min(expected.len() - offset);
            expected.splice(offset..offset + overlap, patch.iter().copied());

            let mut backend = InMemoryBackend::with_data(initial);
            backend.write_at(offset as u64, &patch).unwrap();
            prop_assert_eq!(backend.data(), expected);
        }
    }
}
