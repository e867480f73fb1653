//! CLI command implementations.

pub mod compact;
pub mod inspect;
pub mod reset;
pub mod serve;
pub mod verify;

use ddb_core::{DocumentStore, StoreConfig};
use std::path::Path;

/// Opens an existing store; maintenance commands never create one.
fn open_existing(path: &Path) -> Result<DocumentStore, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {:?}", path).into());
    }
    Ok(DocumentStore::open_with_config(
        StoreConfig::new().path(path).create_if_missing(false),
    )?)
}
