//! # DDB Core
//!
//! Storage engine for DDB, a single-file JSON document store.
//!
//! This crate provides:
//! - The record [`scanner`], which walks the store file through the
//!   streaming tokenizer and reports record byte ranges
//! - Identifier recovery and issuance ([`SequenceGenerator`])
//! - Insert, find and delete on top of the scanner ([`DocumentStore`])
//! - In-place space reclamation after deletes, and explicit compaction
//! - Bounds-checked file edits ([`file_ops`])
//!
//! ## Store file
//!
//! ```text
//! [
//! {"s":1,"d":{"_id":"000000000000000000000001","a":1}},
//! {"s":0,"d":{"_id":"000000000000000000000002","a":2}}
//! ]
//! ```
//!
//! The file is the only source of truth. Nothing is cached between
//! operations except the next identifier.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod compactor;
mod config;
mod error;
pub mod file_ops;
mod id;
mod lock;
mod record;
pub mod scanner;
mod sequence;
mod store;

pub use compactor::{
    apply_delete, compact, plan_delete, relocate, CompactionStats, DeleteOutcome, DeletePlan,
};
pub use config::{StoreConfig, DEFAULT_STORE_PATH};
pub use error::{CoreError, CoreResult};
pub use id::{DocumentId, ID_LENGTH};
pub use lock::{lock_path, StoreLock};
pub use record::{
    encode_record, RecordStatus, ARRAY_CLOSE, EMPTY_STORE, STATUS_ACTIVE, STATUS_OFFSET,
    STATUS_TOMBSTONED,
};
pub use scanner::{collect_records, scan, RecordInfo, ScanControl, ScanSummary};
pub use sequence::{recover_highest_id, SequenceGenerator};
pub use store::{DocumentStore, StoreStats, VerifyIssue, ID_FIELD};

/// Version of the DDB core crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
