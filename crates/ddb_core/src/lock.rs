//! Cross-process store lock.
//!
//! A store file `data.json` is guarded by an advisory lock on
//! `data.json.lock` next to it. The lock is held for the lifetime of the
//! [`StoreLock`] and released when the file handle is closed.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock on a store.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
    _file: File,
}

impl StoreLock {
    /// Acquires the lock for the store at `store_path`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StoreLocked`] if another process holds the lock,
    /// or an I/O error if the lock file cannot be created.
    pub fn acquire(store_path: &Path) -> CoreResult<Self> {
        let path = lock_path(store_path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(CoreError::StoreLocked);
        }

        Ok(Self { path, _file: file })
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Returns the lock file path for a store file.
#[must_use]
pub fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn lock_path_appends_suffix() {
        assert_eq!(
            lock_path(Path::new("dir/default.ddb.json")),
            PathBuf::from("dir/default.ddb.json.lock")
        );
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = tempdir().unwrap();
        let store = temp.path().join("store.json");

        let first = StoreLock::acquire(&store).unwrap();
        assert!(first.path().exists());

        let second = StoreLock::acquire(&store);
        assert!(matches!(second, Err(CoreError::StoreLocked)));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let store = temp.path().join("store.json");

        {
            let _lock = StoreLock::acquire(&store).unwrap();
        }

        let _again = StoreLock::acquire(&store).unwrap();
    }
}
