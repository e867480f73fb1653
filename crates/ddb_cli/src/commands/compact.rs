//! Compact command implementation.

use ddb_core::CompactionStats;
use std::path::Path;

/// Runs the compact command.
pub fn run(path: &Path, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_existing(path)?;

    println!("Compacting store at {:?}", path);
    if dry_run {
        println!("(dry run - no changes will be made)");
    }
    println!();

    let stats = if dry_run {
        store.compact_dry_run()?
    } else {
        store.compact()?
    };
    print_stats(&stats);

    if !dry_run {
        println!();
        if stats.reclaimed() > 0 {
            println!("✓ Compaction complete");
        } else {
            println!("No compaction needed - store is already optimal");
        }
    }

    Ok(())
}

fn print_stats(stats: &CompactionStats) {
    println!("Compaction Analysis:");
    println!("  Passes:           {}", stats.passes);
    println!("  Records moved:    {}", stats.relocations);
    println!();
    println!("  Size before: {} bytes", stats.bytes_before);
    println!("  Size after:  {} bytes", stats.bytes_after);
    println!(
        "  Space saved: {} bytes ({:.1}%)",
        stats.reclaimed(),
        if stats.bytes_before > 0 {
            (stats.reclaimed() as f64 / stats.bytes_before as f64) * 100.0
        } else {
            0.0
        }
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddb_core::DocumentStore;
    use tempfile::tempdir;

    fn store_with_trailing_tombstones(path: &Path) {
        let store = DocumentStore::open(path).unwrap();
        for i in 0..4 {
            store
                .insert_json(format!("{{\"n\":{i}}}").as_bytes())
                .unwrap();
        }
        store.delete("000000000000000000000004").unwrap();
        store.delete("000000000000000000000003").unwrap();
    }

    #[test]
    fn dry_run_leaves_file_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        store_with_trailing_tombstones(&path);
        let before = std::fs::read(&path).unwrap();

        run(&path, true).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn compact_shrinks_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        store_with_trailing_tombstones(&path);
        let before = std::fs::metadata(&path).unwrap().len();

        run(&path, false).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() < before);
    }
}
