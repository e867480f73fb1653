//! The document store.

use crate::compactor::{self, CompactionStats, DeleteOutcome};
use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::file_ops::{last_significant_byte, reset_store};
use crate::id::{DocumentId, ID_LENGTH};
use crate::lock::StoreLock;
use crate::record::{encode_record, RecordStatus, ARRAY_CLOSE, EMPTY_STORE};
use crate::scanner::{scan, ScanControl};
use crate::sequence::SequenceGenerator;
use ddb_codec::{render, CodecError, ExtraField, Span, TokenTree};
use ddb_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

/// Name of the identifier field injected into every document.
pub const ID_FIELD: &str = "_id";

/// Record counts and sizes reported by [`DocumentStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoreStats {
    /// Active records.
    pub active: usize,
    /// Tombstoned records, including filler records.
    pub tombstoned: usize,
    /// Records whose status is neither `0` nor `1`.
    pub unknown: usize,
    /// Size of the store file in bytes.
    pub file_size: u64,
    /// Identifier the next insert will receive, `None` once exhausted.
    pub next_id: Option<DocumentId>,
}

/// A problem found by [`DocumentStore::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyIssue {
    /// The file could not be scanned.
    Corrupt {
        /// Offset where scanning failed.
        offset: u64,
        /// Description of the failure.
        message: String,
    },
    /// An active record has no parseable identifier.
    MissingIdentifier {
        /// Start of the record.
        offset: u64,
    },
    /// Two active records share an identifier.
    DuplicateIdentifier {
        /// The shared identifier.
        id: String,
        /// Start of the later record.
        offset: u64,
    },
    /// The file does not end with `\n]`.
    BadTail,
}

impl std::fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Corrupt { offset, message } => write!(f, "corrupt at offset {offset}: {message}"),
            Self::MissingIdentifier { offset } => {
                write!(f, "active record at offset {offset} has no valid _id")
            }
            Self::DuplicateIdentifier { id, offset } => {
                write!(f, "duplicate _id {id} at offset {offset}")
            }
            Self::BadTail => write!(f, "file does not end with a closing bracket line"),
        }
    }
}

struct StoreInner {
    backend: Box<dyn StorageBackend>,
    sequence: SequenceGenerator,
}

/// A single-file JSON document store.
///
/// All operations take one internal lock, so a store can be shared across
/// threads behind an `Arc`. Only one `DocumentStore` may have a given file
/// open at a time; a second opener gets [`CoreError::StoreLocked`].
///
/// # Example
///
/// ```rust
/// use ddb_core::DocumentStore;
///
/// let store = DocumentStore::open_in_memory().unwrap();
/// let id = store.insert_json(br#"{"a":1}"#).unwrap();
/// assert_eq!(id.to_string(), "000000000000000000000001");
/// assert_eq!(
///     store.find(&id.to_string()).unwrap(),
///     br#"{"_id":"000000000000000000000001","a":1}"#
/// );
/// ```
pub struct DocumentStore {
    config: StoreConfig,
    inner: Mutex<StoreInner>,
    _lock: Option<StoreLock>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("path", &self.config.path)
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    /// Opens the store file at `path` with default settings.
    ///
    /// # Errors
    ///
    /// See [`Self::open_with_config`].
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with_config(StoreConfig::new().path(path.as_ref()))
    }

    /// Opens the store file named in `config`.
    ///
    /// A missing or zero-length file is initialised to `[\n]`. The
    /// identifier sequence is recovered by scanning the whole file.
    ///
    /// # Errors
    ///
    /// - [`CoreError::StoreLocked`] if another process has the store open
    /// - [`CoreError::StorageCorruption`] if the file is not a record array
    /// - an I/O error if the file is missing and `create_if_missing` is off
    pub fn open_with_config(config: StoreConfig) -> CoreResult<Self> {
        let path = config.path.clone();
        if !path.exists() {
            if !config.create_if_missing {
                return Err(CoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("store file does not exist: {}", path.display()),
                )));
            }
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let lock = StoreLock::acquire(&path)?;
        let backend = FileBackend::open(&path)?;
        let store = Self::with_backend(Box::new(backend), config, Some(lock))?;
        info!(path = %path.display(), next_id = ?store.inner.lock().sequence.peek(), "opened store");
        Ok(store)
    }

    /// Opens a store over an arbitrary backend. No file lock is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend content is not a record array.
    pub fn open_with_backend(
        backend: Box<dyn StorageBackend>,
        config: StoreConfig,
    ) -> CoreResult<Self> {
        Self::with_backend(backend, config, None)
    }

    /// Opens an empty store held in memory.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other openers.
    pub fn open_in_memory() -> CoreResult<Self> {
        Self::open_with_backend(Box::new(InMemoryBackend::new()), StoreConfig::default())
    }

    fn with_backend(
        mut backend: Box<dyn StorageBackend>,
        config: StoreConfig,
        lock: Option<StoreLock>,
    ) -> CoreResult<Self> {
        if backend.size()? == 0 {
            backend.append(EMPTY_STORE)?;
            backend.sync()?;
        }
        let sequence = SequenceGenerator::recover(backend.as_ref(), config.scan_chunk_size)?;
        Ok(Self {
            config,
            inner: Mutex::new(StoreInner { backend, sequence }),
            _lock: lock,
        })
    }

    /// Returns the store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Parses `body` as JSON and inserts it.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Codec`] if `body` is not valid JSON or has more than
    ///   `max_tokens` tokens
    /// - see [`Self::insert`] for the rest
    pub fn insert_json(&self, body: &[u8]) -> CoreResult<DocumentId> {
        let tree = TokenTree::parse(body, self.config.max_tokens)?;
        self.insert(body, &tree)
    }

    /// Inserts the object described by `tree` and returns its new
    /// identifier.
    ///
    /// The document is stored in compact form with `_id` as its first
    /// field. A sequence number is used up even when the write fails.
    ///
    /// # Errors
    ///
    /// - [`CoreError::MalformedInput`] if the root is not an object
    /// - [`CoreError::TooLarge`] if the document exceeds `max_document_size`
    /// - [`CoreError::StorageCorruption`] if the file does not end with `\n]`
    /// - [`CoreError::IdentifiersExhausted`] if no identifier is left, in
    ///   which case nothing is written
    pub fn insert(&self, source: &[u8], tree: &TokenTree) -> CoreResult<DocumentId> {
        if !tree.is_object() {
            return Err(CoreError::malformed("top level element must be an object"));
        }

        let mut inner = self.inner.lock();
        let id = inner.sequence.next_id()?;
        let id_text = id.to_string();
        let rendered = render(
            tree,
            source,
            Some(ExtraField::new(ID_FIELD, &id_text)),
            self.config.max_document_size,
        )
        .map_err(|err| match err {
            CodecError::TooLarge { needed, limit } => CoreError::TooLarge { needed, limit },
            other => CoreError::Codec(other),
        })?;

        let record = encode_record(&rendered);
        append_record(inner.backend.as_mut(), &record)?;
        if self.config.sync_on_write {
            inner.backend.sync()?;
        }
        debug!(id = %id_text, bytes = record.len(), "inserted document");
        Ok(id)
    }

    /// Returns the raw bytes of the active document with identifier `id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no active record matches, or a
    /// scan error if the file is corrupt.
    pub fn find(&self, id: &str) -> CoreResult<Vec<u8>> {
        if id.len() != ID_LENGTH {
            return Err(CoreError::not_found(id));
        }

        let inner = self.inner.lock();
        let mut found: Option<Span> = None;
        scan(inner.backend.as_ref(), self.config.scan_chunk_size, |record| {
            if record.status.is_active() && record.has_identifier(id.as_bytes()) {
                found = record.document;
                return ScanControl::Stop;
            }
            ScanControl::Continue
        })?;

        let Some(document) = found else {
            debug!(id, "document not found");
            return Err(CoreError::not_found(id));
        };
        let bytes = inner
            .backend
            .read_at(document.start, document.len() as usize)?;
        debug!(id, bytes = bytes.len(), "found document");
        Ok(bytes)
    }

    /// Deletes the active document with identifier `id` and reclaims its
    /// space where possible.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no active record matches; the file
    /// is left byte-for-byte unchanged in that case and on scan errors.
    pub fn delete(&self, id: &str) -> CoreResult<DeleteOutcome> {
        if id.len() != ID_LENGTH {
            return Err(CoreError::not_found(id));
        }

        let mut inner = self.inner.lock();
        let plan = compactor::plan_delete(
            inner.backend.as_ref(),
            self.config.scan_chunk_size,
            id.as_bytes(),
        )?;
        let Some(plan) = plan else {
            debug!(id, "nothing to delete");
            return Err(CoreError::not_found(id));
        };

        let outcome = compactor::apply_delete(inner.backend.as_mut(), &plan)?;
        if self.config.sync_on_write {
            inner.backend.sync()?;
        }
        debug!(id, ?outcome, "deleted document");
        Ok(outcome)
    }

    /// Wipes the store to `[\n]` and restarts identifiers at `1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be rewritten.
    pub fn reset(&self) -> CoreResult<()> {
        let mut inner = self.inner.lock();
        reset_store(inner.backend.as_mut())?;
        inner.backend.sync()?;
        inner.sequence.reset();
        info!("store reset");
        Ok(())
    }

    /// Recovers the identifier sequence from the file, as on open. Returns
    /// the identifier the next insert will receive, or `None` if the file
    /// already holds the highest possible identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be scanned.
    pub fn resync(&self) -> CoreResult<Option<DocumentId>> {
        let mut inner = self.inner.lock();
        inner.sequence =
            SequenceGenerator::recover(inner.backend.as_ref(), self.config.scan_chunk_size)?;
        let next = inner.sequence.peek();
        info!(next_id = ?next, "sequence resynchronized");
        Ok(next)
    }

    /// Compacts the store file.
    ///
    /// # Errors
    ///
    /// Returns an error if a scan or write fails.
    pub fn compact(&self) -> CoreResult<CompactionStats> {
        let mut inner = self.inner.lock();
        let stats = compactor::compact(inner.backend.as_mut(), self.config.scan_chunk_size)?;
        inner.backend.sync()?;
        Ok(stats)
    }

    /// Reports what [`Self::compact`] would do, using an in-memory copy of
    /// the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or scanned.
    pub fn compact_dry_run(&self) -> CoreResult<CompactionStats> {
        let inner = self.inner.lock();
        let size = inner.backend.size()?;
        let data = inner.backend.read_at(0, size as usize)?;
        drop(inner);

        let mut copy = InMemoryBackend::with_data(data);
        compactor::compact(&mut copy, self.config.scan_chunk_size)
    }

    /// Counts records by status.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be scanned.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        let inner = self.inner.lock();
        let mut stats = StoreStats {
            file_size: inner.backend.size()?,
            next_id: inner.sequence.peek(),
            ..StoreStats::default()
        };
        scan(inner.backend.as_ref(), self.config.scan_chunk_size, |record| {
            match record.status {
                RecordStatus::Active => stats.active += 1,
                RecordStatus::Tombstoned => stats.tombstoned += 1,
                RecordStatus::Unknown(_) => stats.unknown += 1,
            }
            ScanControl::Continue
        })?;
        Ok(stats)
    }

    /// Checks the file for structural problems without changing it.
    ///
    /// Returns an empty list for a healthy store.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be read. Scan failures are
    /// reported as [`VerifyIssue::Corrupt`].
    pub fn verify(&self) -> CoreResult<Vec<VerifyIssue>> {
        let inner = self.inner.lock();
        let mut issues = Vec::new();
        let mut seen: HashMap<[u8; ID_LENGTH], u64> = HashMap::new();

        let scanned = scan(inner.backend.as_ref(), self.config.scan_chunk_size, |record| {
            if !record.status.is_active() {
                return ScanControl::Continue;
            }
            match (record.identifier, record.id()) {
                (Some(raw), Some(_)) => {
                    if seen.insert(raw, record.container.start).is_some() {
                        issues.push(VerifyIssue::DuplicateIdentifier {
                            id: String::from_utf8_lossy(&raw).into_owned(),
                            offset: record.container.start,
                        });
                    }
                }
                _ => issues.push(VerifyIssue::MissingIdentifier {
                    offset: record.container.start,
                }),
            }
            ScanControl::Continue
        });
        match scanned {
            Ok(_) => {}
            Err(CoreError::StorageCorruption { offset, message }) => {
                issues.push(VerifyIssue::Corrupt { offset, message });
            }
            Err(other) => return Err(other),
        }

        let size = inner.backend.size()?;
        let tail_ok = size >= ARRAY_CLOSE.len() as u64
            && inner
                .backend
                .read_at(size - ARRAY_CLOSE.len() as u64, ARRAY_CLOSE.len())?
                == ARRAY_CLOSE;
        if !tail_ok {
            issues.push(VerifyIssue::BadTail);
        }

        if !issues.is_empty() {
            warn!(issues = issues.len(), "store verification found problems");
        }
        Ok(issues)
    }

    /// Returns a copy of the whole store file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn raw_contents(&self) -> CoreResult<Vec<u8>> {
        let inner = self.inner.lock();
        let size = inner.backend.size()?;
        Ok(inner.backend.read_at(0, size as usize)?)
    }
}

/// Appends an encoded record to the array, re-closing it with `\n]`.
///
/// The new bytes are assembled in memory and written with one positional
/// write over the old closing bracket.
fn append_record(backend: &mut dyn StorageBackend, record: &[u8]) -> CoreResult<()> {
    let size = backend.size()?;
    let mut out = Vec::with_capacity(record.len() + 4);

    if size <= ARRAY_CLOSE.len() as u64 {
        out.push(b'[');
        out.push(b'\n');
        out.extend_from_slice(record);
        out.extend_from_slice(ARRAY_CLOSE);
        backend.truncate(0)?;
        backend.write_at(0, &out)?;
        return Ok(());
    }

    let close_at = size - ARRAY_CLOSE.len() as u64;
    let tail = backend.read_at(close_at, ARRAY_CLOSE.len())?;
    if tail != ARRAY_CLOSE {
        return Err(CoreError::storage_corruption(
            close_at,
            "store file does not end with a closing bracket line",
        ));
    }

    match last_significant_byte(backend, close_at)? {
        Some((_, b'[')) => {}
        Some(_) => out.push(b','),
        None => {
            return Err(CoreError::storage_corruption(0, "store file has no opening bracket"));
        }
    }
    out.push(b'\n');
    out.extend_from_slice(record);
    out.extend_from_slice(ARRAY_CLOSE);
    backend.write_at(close_at, &out)?;
    Ok(())
}
