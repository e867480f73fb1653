//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A store file on disk.
///
/// The length is never cached: every bounds check asks the file system, so
/// edits made to the file by another program while it is open are seen by
/// the next scan.
///
/// # Example
///
/// ```no_run
/// use ddb_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("default.ddb.json")).unwrap();
/// backend.append(b"[\n]").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    file: Mutex<File>,
}

impl FileBackend {
    /// Opens the file at `path` for reading and writing, creating it empty
    /// if it does not exist. Existing content is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

fn current_len(file: &File) -> StorageResult<u64> {
    Ok(file.metadata()?.len())
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut file = self.file.lock();
        let size = current_len(&file)?;
        if offset.saturating_add(len as u64) > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; len];
        file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let file = self.file.get_mut();
        let size = current_len(file)?;
        if offset > size {
            return Err(StorageError::WritePastEnd { offset, size });
        }
        if data.is_empty() {
            return Ok(());
        }

        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        Ok(())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let file = self.file.get_mut();
        let offset = file.seek(SeekFrom::End(0))?;
        file.write_all(data)?;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.file.get_mut().flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        current_len(&self.file.lock())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.file.get_mut().sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let file = self.file.get_mut();
        let size = current_len(file)?;
        if new_size > size {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot truncate to {new_size} bytes, file holds {size}"),
            )));
        }
        file.set_len(new_size)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_at_extends_array_over_closing_bracket() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"[\n]").unwrap();
        backend.write_at(1, b"\n{\"s\":1}\n]").unwrap();
        backend.write_at(6, b"0").unwrap();
        backend.sync().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[\n{\"s\":0}\n]");
        assert_eq!(backend.size().unwrap(), 11);
    }

    #[test]
    fn write_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut backend = FileBackend::open(&dir.path().join("store.json")).unwrap();
        backend.append(b"[\n]").unwrap();

        let result = backend.write_at(4, b"x");
        assert!(matches!(result, Err(StorageError::WritePastEnd { offset: 4, size: 3 })));
        assert!(matches!(
            backend.read_at(2, 5),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn truncate_then_reclose() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"[\n{},\n{}\n]").unwrap();
        backend.truncate(4).unwrap();
        backend.append(b"\n]").unwrap();
        backend.sync().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"[\n{}\n]");
        assert!(backend.truncate(10).is_err());
    }

    #[test]
    fn sees_external_rewrites() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"[\n]").unwrap();
        backend.sync().unwrap();

        std::fs::write(&path, b"[\n{\"s\":0}\n]").unwrap();
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(0, 11).unwrap(), b"[\n{\"s\":0}\n]");

        std::fs::write(&path, b"[]").unwrap();
        assert_eq!(backend.size().unwrap(), 2);
        assert!(matches!(
            backend.read_at(0, 3),
            Err(StorageError::ReadPastEnd { size: 2, .. })
        ));
    }
}
