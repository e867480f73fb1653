//! Store file scanner.
//!
//! The scanner feeds the store file through [`StreamTokenizer`] in chunks
//! and reports one [`RecordInfo`] per top-level record, with the byte
//! ranges needed to patch, copy or truncate it. Position in the file is
//! tracked with an explicit scope stack:
//!
//! | scope         | meaning                                      |
//! |---------------|----------------------------------------------|
//! | (empty)       | outside the record array                     |
//! | `InArray`     | directly inside the record array             |
//! | `InContainer` | inside a record object                       |
//! | `InDocument`  | inside the document object of a record       |
//! | `Nested`      | anywhere deeper                              |
//!
//! The scanner keeps no state between calls.

use crate::error::{CoreError, CoreResult};
use crate::id::{DocumentId, ID_LENGTH};
use crate::record::RecordStatus;
use ddb_codec::{CodecError, Event, Span, StreamTokenizer};
use ddb_storage::StorageBackend;

/// What the record handler wants the scan to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    /// Keep scanning.
    Continue,
    /// Stop after this record.
    Stop,
}

/// One record observed by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordInfo {
    /// Record status. Records without `s` are tombstoned.
    pub status: RecordStatus,
    /// Raw identifier text, if the document carries a 24-byte `_id`.
    pub identifier: Option<[u8; ID_LENGTH]>,
    /// Bytes of the status primitive.
    pub status_span: Option<Span>,
    /// The whole record object, `{` to one past `}`.
    pub container: Span,
    /// The document object, if the record has one.
    pub document: Option<Span>,
}

impl RecordInfo {
    /// Parses the identifier as a sequence number.
    #[must_use]
    pub fn id(&self) -> Option<DocumentId> {
        self.identifier.and_then(|raw| DocumentId::parse(&raw))
    }

    /// Returns true if the record carries exactly this identifier text.
    #[must_use]
    pub fn has_identifier(&self, identifier: &[u8]) -> bool {
        self.identifier
            .as_ref()
            .is_some_and(|raw| raw.as_slice() == identifier)
    }

    /// Length of the record in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.container.len()
    }

    /// Returns true if the record covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.container.is_empty()
    }
}

/// Totals reported at the end of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    /// Records reported to the handler.
    pub records: usize,
    /// True if the handler stopped the scan early.
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    InArray,
    InContainer,
    InDocument,
    Nested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Nothing,
    Status,
    Document,
    Identifier,
}

/// Reasons a scan leaves the tokenizer loop.
enum Interrupt {
    Codec(CodecError),
    Stop,
    NotArray(u64),
}

impl From<CodecError> for Interrupt {
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

struct ScanState {
    scopes: Vec<Scope>,
    pending: Pending,
    status: Option<RecordStatus>,
    status_span: Option<Span>,
    identifier: Option<[u8; ID_LENGTH]>,
    container_start: u64,
    document: Option<Span>,
    records: usize,
}

impl ScanState {
    fn new() -> Self {
        Self {
            scopes: Vec::new(),
            pending: Pending::Nothing,
            status: None,
            status_span: None,
            identifier: None,
            container_start: 0,
            document: None,
            records: 0,
        }
    }

    fn reset_record(&mut self, start: u64) {
        self.pending = Pending::Nothing;
        self.status = None;
        self.status_span = None;
        self.identifier = None;
        self.container_start = start;
        self.document = None;
    }

    fn on_event<F>(&mut self, event: Event<'_>, on_record: &mut F) -> Result<(), Interrupt>
    where
        F: FnMut(&RecordInfo) -> ScanControl,
    {
        let top = self.scopes.last().copied();
        let pending = std::mem::replace(&mut self.pending, Pending::Nothing);
        match event {
            Event::ArrayStart { .. } => {
                let scope = if top.is_none() {
                    Scope::InArray
                } else {
                    Scope::Nested
                };
                self.scopes.push(scope);
            }
            Event::ObjectStart { offset } => match top {
                None => return Err(Interrupt::NotArray(offset)),
                Some(Scope::InArray) => {
                    self.reset_record(offset);
                    self.scopes.push(Scope::InContainer);
                }
                Some(Scope::InContainer) if pending == Pending::Document => {
                    self.document = Some(Span::new(offset, offset + 1));
                    self.scopes.push(Scope::InDocument);
                }
                Some(_) => self.scopes.push(Scope::Nested),
            },
            Event::ObjectEnd { offset } => match self.scopes.pop() {
                Some(Scope::InDocument) => {
                    if let Some(document) = self.document.as_mut() {
                        document.end = offset + 1;
                    }
                }
                Some(Scope::InContainer) => {
                    let info = RecordInfo {
                        status: self.status.unwrap_or(RecordStatus::Tombstoned),
                        identifier: self.identifier,
                        status_span: self.status_span,
                        container: Span::new(self.container_start, offset + 1),
                        document: self.document,
                    };
                    self.reset_record(offset + 1);
                    self.records += 1;
                    if on_record(&info) == ScanControl::Stop {
                        return Err(Interrupt::Stop);
                    }
                }
                _ => {}
            },
            Event::ArrayEnd { .. } => {
                self.scopes.pop();
            }
            Event::Key { text, .. } => {
                self.pending = match (top, text) {
                    (Some(Scope::InContainer), b"s") => Pending::Status,
                    (Some(Scope::InContainer), b"d") => Pending::Document,
                    (Some(Scope::InDocument), b"_id") => Pending::Identifier,
                    _ => Pending::Nothing,
                };
            }
            Event::String { text, span } => {
                if top.is_none() {
                    return Err(Interrupt::NotArray(span.start.saturating_sub(1)));
                }
                if pending == Pending::Identifier && self.identifier.is_none() {
                    if let Ok(raw) = <[u8; ID_LENGTH]>::try_from(text) {
                        self.identifier = Some(raw);
                    }
                }
            }
            Event::Primitive { text, span } => {
                if top.is_none() {
                    return Err(Interrupt::NotArray(span.start));
                }
                if pending == Pending::Status {
                    self.status = Some(RecordStatus::from_primitive(text));
                    self.status_span = Some(span);
                }
            }
        }
        Ok(())
    }
}

/// Scans every record in `backend`, calling `on_record` for each one in
/// file order.
///
/// An empty or whitespace-only file is an empty store. The file is read
/// with positional reads of at most `chunk_size` bytes.
///
/// # Errors
///
/// Returns [`CoreError::StorageCorruption`] if the file is not a JSON array
/// (tokenizer error, premature end, unbalanced brackets or a non-array
/// root), or a storage error if a read fails. Records already passed to the
/// handler stay reported; callers defer writes until the scan returns.
pub fn scan<F>(
    backend: &dyn StorageBackend,
    chunk_size: usize,
    mut on_record: F,
) -> CoreResult<ScanSummary>
where
    F: FnMut(&RecordInfo) -> ScanControl,
{
    let size = backend.size()?;
    let chunk_size = chunk_size.max(1) as u64;
    let mut tokenizer = StreamTokenizer::new();
    let mut state = ScanState::new();
    let mut offset = 0u64;

    while offset < size {
        let len = chunk_size.min(size - offset);
        let chunk = backend.read_at(offset, len as usize)?;
        let fed = tokenizer.feed_slice(&chunk, |event| state.on_event(event, &mut on_record));
        match fed {
            Ok(()) => {}
            Err(Interrupt::Stop) => {
                return Ok(ScanSummary {
                    records: state.records,
                    stopped: true,
                });
            }
            Err(interrupt) => {
                return Err(corruption(interrupt, tokenizer.offset().saturating_sub(1)));
            }
        }
        offset += len;
    }

    let finished = tokenizer.finish(|event| state.on_event(event, &mut on_record));
    match finished {
        Ok(()) => {}
        Err(Interrupt::Stop) => {
            return Ok(ScanSummary {
                records: state.records,
                stopped: true,
            });
        }
        Err(interrupt) => return Err(corruption(interrupt, tokenizer.offset())),
    }

    Ok(ScanSummary {
        records: state.records,
        stopped: false,
    })
}

fn corruption(interrupt: Interrupt, offset: u64) -> CoreError {
    let err = match interrupt {
        Interrupt::Codec(err) => CoreError::storage_corruption(offset, err.to_string()),
        Interrupt::NotArray(at) => CoreError::storage_corruption(at, "root value is not an array"),
        Interrupt::Stop => CoreError::storage_corruption(offset, "scan stopped"),
    };
    tracing::warn!(error = %err, "store file is corrupt");
    err
}

/// Collects every record of `backend`.
///
/// # Errors
///
/// Same as [`scan`].
pub fn collect_records(backend: &dyn StorageBackend, chunk_size: usize) -> CoreResult<Vec<RecordInfo>> {
    let mut records = Vec::new();
    scan(backend, chunk_size, |record| {
        records.push(record.clone());
        ScanControl::Continue
    })?;
    Ok(records)
}
