//! Verify command implementation.

use ddb_core::{CoreError, VerifyIssue};
use std::path::Path;

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying store at {:?}", path);
    println!();

    let issues = match super::open_existing(path) {
        Ok(store) => {
            let stats = store.stats();
            let issues = store.verify()?;
            if let Ok(stats) = stats {
                println!(
                    "  records checked: {}, active: {}, tombstoned: {}",
                    stats.active + stats.tombstoned + stats.unknown,
                    stats.active,
                    stats.tombstoned
                );
            }
            issues
        }
        Err(err) => match err.downcast::<CoreError>() {
            Ok(core) => match *core {
                CoreError::StorageCorruption { offset, message } => {
                    vec![VerifyIssue::Corrupt { offset, message }]
                }
                other => return Err(other.into()),
            },
            Err(other) => return Err(other),
        },
    };

    for issue in &issues {
        println!("    ERROR: {}", issue);
    }

    println!();
    if issues.is_empty() {
        println!("✓ Store verification passed");
        Ok(())
    } else {
        println!("✗ Store verification failed");
        Err("Verification failed".into())
    }
}
