//! Inspect command implementation.

use crate::OutputFormat;
use ddb_core::StoreStats;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store file path.
    pub path: String,
    /// Store file size in bytes.
    pub file_size: u64,
    /// Number of active documents.
    pub active_records: usize,
    /// Number of tombstoned records.
    pub tombstoned_records: usize,
    /// Number of records with an unrecognised status.
    pub unknown_records: usize,
    /// Identifier the next insert will receive, `None` once exhausted.
    pub next_id: Option<String>,
}

impl InspectResult {
    fn new(path: &Path, stats: &StoreStats) -> Self {
        Self {
            path: path.display().to_string(),
            file_size: stats.file_size,
            active_records: stats.active,
            tombstoned_records: stats.tombstoned,
            unknown_records: stats.unknown,
            next_id: stats.next_id.map(|id| id.to_string()),
        }
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;
    let result = InspectResult::new(path, &store.stats()?);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        OutputFormat::Text => print_text_output(&result),
    }

    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Store: {}", result.path);
    println!();
    println!("File size:    {} bytes", result.file_size);
    println!("Active:       {}", result.active_records);
    println!("Tombstoned:   {}", result.tombstoned_records);
    if result.unknown_records > 0 {
        println!("Unknown:      {}", result.unknown_records);
    }
    println!(
        "Next _id:     {}",
        result.next_id.as_deref().unwrap_or("exhausted")
    );
}
