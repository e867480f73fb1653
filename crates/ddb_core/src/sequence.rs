//! Identifier sequence.
//!
//! The next identifier is derived from the store file: on open and on
//! resynchronize the whole file is scanned and the counter is seeded with
//! one more than the highest identifier found, whatever the record status.
//! Once `u64::MAX` has been issued or found in the file the sequence is
//! exhausted and inserts fail.

use crate::error::{CoreError, CoreResult};
use crate::id::DocumentId;
use crate::scanner::{scan, ScanControl};
use ddb_storage::StorageBackend;

/// Returns the highest identifier stored in `backend`, or `0` if there is
/// none.
///
/// Tombstoned records count. Identifiers that are not valid 64-bit hex are
/// ignored.
///
/// # Errors
///
/// Returns an error if the file cannot be scanned.
pub fn recover_highest_id(backend: &dyn StorageBackend, chunk_size: usize) -> CoreResult<u64> {
    let mut highest = 0u64;
    scan(backend, chunk_size, |record| {
        if let Some(id) = record.id() {
            highest = highest.max(id.as_u64());
        }
        ScanControl::Continue
    })?;
    Ok(highest)
}

/// Monotonic identifier generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceGenerator {
    /// `None` once every identifier has been used.
    next: Option<u64>,
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self { next: Some(1) }
    }
}

impl SequenceGenerator {
    /// Creates a generator that starts at `1`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a generator seeded from the highest identifier in `backend`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be scanned.
    pub fn recover(backend: &dyn StorageBackend, chunk_size: usize) -> CoreResult<Self> {
        let highest = recover_highest_id(backend, chunk_size)?;
        Ok(Self {
            next: highest.checked_add(1),
        })
    }

    /// Returns the identifier the next call to [`Self::next_id`] will issue,
    /// or `None` if the sequence is exhausted.
    #[must_use]
    pub fn peek(&self) -> Option<DocumentId> {
        self.next.map(DocumentId::new)
    }

    /// Issues the next identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IdentifiersExhausted`] once `u64::MAX` has been
    /// issued. The sequence is left unchanged.
    pub fn next_id(&mut self) -> CoreResult<DocumentId> {
        let value = self.next.ok_or(CoreError::IdentifiersExhausted)?;
        self.next = value.checked_add(1);
        Ok(DocumentId::new(value))
    }

    /// Restarts the sequence at `1`.
    pub fn reset(&mut self) {
        self.next = Some(1);
    }
}
