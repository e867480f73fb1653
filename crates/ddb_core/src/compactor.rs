//! Delete planning and space reclamation.
//!
//! A delete flips the record's status byte and then tries to give the space
//! back. The scan that finds the record also measures the *hole* around it
//! (the target plus adjacent tombstones) and remembers the last active
//! record after it. If that record fits in the hole it is copied there and
//! the file is cut just before its old position.
//!
//! ```text
//! before:  [ {T}, {x}, {y}, {L} ]     T target, x/y tombstones, L last active
//! after:   [ {L},{     }, {y} ]       L copied over T and x, file cut before old L
//! ```
//!
//! Any hole space that `L` does not use becomes padding inside `L`, or a
//! filler record `{    }` when there is room for one.
//!
//! [`compact`] repeats the same relocation as a maintenance pass until the
//! file cannot shrink further.

use crate::error::{CoreError, CoreResult};
use crate::file_ops::{
    close_array_at, patch_byte, reset_store, splice, tombstone_status, truncate_array_at,
};
use crate::record::{RecordStatus, EMPTY_STORE, STATUS_ACTIVE, STATUS_TOMBSTONED};
use crate::scanner::{collect_records, scan, RecordInfo, ScanControl};
use ddb_codec::Span;
use ddb_storage::StorageBackend;
use tracing::{debug, error, info};

/// Filler written between a relocated record and a padding record.
const FILLER_JOIN: &[u8] = b"},\n{";

/// How a delete reclaimed space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// No active record was left; the file was reset to `[\n]`.
    Emptied,
    /// The last active record was moved into the hole.
    Relocated {
        /// Bytes removed from the end of the file.
        reclaimed: u64,
    },
    /// Only the status byte was flipped.
    Tombstoned,
}

/// Everything a delete needs to know, gathered in one scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletePlan {
    /// The active record being deleted.
    pub target: RecordInfo,
    /// Target plus the tombstones directly before and after it.
    pub hole: Span,
    /// The last active record after the target.
    pub last_active: Option<RecordInfo>,
    /// Active records that remain after the delete.
    pub active_count: usize,
}

/// Scans for the active record carrying `identifier` and plans its removal.
///
/// Returns `None` if no active record matches.
///
/// # Errors
///
/// Returns an error if the file cannot be scanned.
pub fn plan_delete(
    backend: &dyn StorageBackend,
    chunk_size: usize,
    identifier: &[u8],
) -> CoreResult<Option<DeletePlan>> {
    let mut target: Option<RecordInfo> = None;
    let mut run_start: Option<u64> = None;
    let mut hole = Span::default();
    let mut growing = false;
    let mut last_active: Option<RecordInfo> = None;
    let mut active_count = 0usize;

    scan(backend, chunk_size, |record| {
        if target.is_none() {
            if record.status.is_active() && record.has_identifier(identifier) {
                hole = Span::new(
                    run_start.unwrap_or(record.container.start),
                    record.container.end,
                );
                growing = true;
                target = Some(record.clone());
                return ScanControl::Continue;
            }
            if record.status.is_tombstoned() {
                run_start.get_or_insert(record.container.start);
            } else {
                run_start = None;
            }
        } else if record.status.is_tombstoned() {
            if growing {
                hole.end = record.container.end;
            }
        } else {
            growing = false;
            if record.status.is_active() {
                last_active = Some(record.clone());
            }
        }
        if record.status.is_active() {
            active_count += 1;
        }
        ScanControl::Continue
    })?;

    Ok(target.map(|target| DeletePlan {
        target,
        hole,
        last_active,
        active_count,
    }))
}

/// Applies a delete plan: tombstone, then reclaim.
///
/// # Errors
///
/// Returns [`CoreError::StorageCorruption`] if the status no longer reads
/// as active, in which case nothing is written. Errors in later steps are
/// logged and returned as-is.
pub fn apply_delete(backend: &mut dyn StorageBackend, plan: &DeletePlan) -> CoreResult<DeleteOutcome> {
    match plan.target.status_span {
        Some(span) if span.len() == 1 => {
            patch_byte(backend, span.start, STATUS_ACTIVE, STATUS_TOMBSTONED)?;
        }
        // active statuses such as `true` or `1.0` are overwritten as a whole
        Some(span) => tombstone_status(backend, span)?,
        None => {
            return Err(CoreError::storage_corruption(
                plan.target.container.start,
                "record to delete has no status",
            ));
        }
    }

    if plan.active_count == 0 {
        reset_store(backend).inspect_err(|err| error!(error = %err, "failed to reset emptied store"))?;
        return Ok(DeleteOutcome::Emptied);
    }

    match &plan.last_active {
        Some(last) if last.len() <= plan.hole.len() => {
            let before = backend.size()?;
            relocate(backend, last.container, plan.hole)?;
            let after = truncate_array_at(backend, last.container.start)
                .inspect_err(|err| error!(error = %err, "failed to truncate after relocation"))?;
            debug!(
                from = last.container.start,
                to = plan.hole.start,
                reclaimed = before.saturating_sub(after),
                "relocated last active record"
            );
            Ok(DeleteOutcome::Relocated {
                reclaimed: before.saturating_sub(after),
            })
        }
        _ => Ok(DeleteOutcome::Tombstoned),
    }
}

/// Copies the record at `source` into `hole` and pads the remainder.
///
/// The hole must be at least as long as the record. The closing `}` moves
/// to the end of the padding when fewer than four bytes are left over;
/// otherwise the padding becomes a filler record.
///
/// # Errors
///
/// Returns an error if the source cannot be read or the hole lies outside
/// the file.
pub fn relocate(backend: &mut dyn StorageBackend, source: Span, hole: Span) -> CoreResult<()> {
    let bytes = backend.read_at(source.start, source.len() as usize)?;
    let fill = fill_hole(&bytes, hole.len() as usize);
    splice(backend, hole.start, &fill)
        .inspect_err(|err| error!(error = %err, "failed to write relocated record"))
}

/// Builds the bytes written over a hole of `hole_len` bytes.
fn fill_hole(record: &[u8], hole_len: usize) -> Vec<u8> {
    let body = record.len().saturating_sub(1);
    let leftover = hole_len.saturating_sub(record.len());
    let mut out = Vec::with_capacity(hole_len);
    out.extend_from_slice(&record[..body]);
    if leftover < FILLER_JOIN.len() {
        out.resize(body + leftover, b' ');
    } else {
        out.extend_from_slice(FILLER_JOIN);
        out.resize(body + leftover, b' ');
    }
    out.push(b'}');
    out
}

/// Statistics of an explicit compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompactionStats {
    /// Scan passes over the file.
    pub passes: usize,
    /// File size before compaction.
    pub bytes_before: u64,
    /// File size after compaction.
    pub bytes_after: u64,
    /// Records moved into holes.
    pub relocations: usize,
}

impl CompactionStats {
    /// Bytes removed from the file.
    #[must_use]
    pub fn reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// Compacts the store until no more space can be reclaimed.
///
/// Each pass trims non-active records after the last active one, then
/// moves the last active record into the first hole that fits it.
///
/// # Errors
///
/// Returns an error if a scan or write fails. Passes already completed stay
/// applied.
pub fn compact(backend: &mut dyn StorageBackend, chunk_size: usize) -> CoreResult<CompactionStats> {
    let mut stats = CompactionStats {
        bytes_before: backend.size()?,
        ..CompactionStats::default()
    };

    loop {
        stats.passes += 1;
        let records = collect_records(backend, chunk_size)?;
        let Some(last_index) = records.iter().rposition(|r| r.status.is_active()) else {
            if !is_empty_store(backend)? {
                reset_store(backend)?;
            }
            break;
        };
        let last = &records[last_index];

        if last_index + 1 < records.len() {
            close_array_at(backend, last.container.end)?;
            debug!(trimmed = records.len() - last_index - 1, "trimmed trailing records");
        }

        let Some(hole) = first_fitting_hole(&records[..last_index], last.len()) else {
            break;
        };
        relocate(backend, last.container, hole)?;
        truncate_array_at(backend, last.container.start)?;
        stats.relocations += 1;
    }

    stats.bytes_after = backend.size()?;
    info!(
        passes = stats.passes,
        relocations = stats.relocations,
        reclaimed = stats.reclaimed(),
        "compaction finished"
    );
    Ok(stats)
}

fn is_empty_store(backend: &dyn StorageBackend) -> CoreResult<bool> {
    let size = backend.size()?;
    if size != EMPTY_STORE.len() as u64 {
        return Ok(false);
    }
    Ok(backend.read_at(0, EMPTY_STORE.len())? == EMPTY_STORE)
}

/// Finds the first maximal run of non-active records that is at least
/// `len` bytes long.
fn first_fitting_hole(records: &[RecordInfo], len: u64) -> Option<Span> {
    let mut run: Option<Span> = None;
    for record in records {
        if record.status == RecordStatus::Active {
            if let Some(hole) = run.take() {
                if hole.len() >= len {
                    return Some(hole);
                }
            }
        } else {
            let hole = run.get_or_insert(record.container);
            hole.end = record.container.end;
        }
    }
    run.filter(|hole| hole.len() >= len)
}
