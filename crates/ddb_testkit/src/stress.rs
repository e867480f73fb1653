//! Stress tests for DDB.
//!
//! These helpers drive a store from several threads at once and report
//! throughput along with the identifiers that were issued.

use ddb_core::{DocumentId, DocumentStore};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Length of the padding string in each document.
    pub payload_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 200,
            threads: 4,
            payload_size: 64,
        }
    }
}

fn document(thread: usize, n: usize, payload_size: usize) -> Vec<u8> {
    format!(
        "{{\"thread\":{thread},\"n\":{n},\"pad\":\"{}\"}}",
        "x".repeat(payload_size)
    )
    .into_bytes()
}

/// Inserts from every thread at once. Returns the result and every
/// identifier that was issued.
pub fn stress_concurrent_inserts(
    store: &Arc<DocumentStore>,
    config: &StressConfig,
) -> (StressTestResult, Vec<DocumentId>) {
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(store);
            let config = config.clone();
            thread::spawn(move || {
                let mut ids = Vec::with_capacity(config.operations);
                let mut failed = 0usize;
                for n in 0..config.operations {
                    match store.insert_json(&document(t, n, config.payload_size)) {
                        Ok(id) => ids.push(id),
                        Err(_) => failed += 1,
                    }
                }
                (ids, failed)
            })
        })
        .collect();

    let mut ids = Vec::new();
    let mut failed = 0usize;
    for handle in handles {
        match handle.join() {
            Ok((thread_ids, thread_failed)) => {
                ids.extend(thread_ids);
                failed += thread_failed;
            }
            Err(_) => failed += config.operations,
        }
    }

    (StressTestResult::new(ids.len(), failed, start.elapsed()), ids)
}

/// Runs inserts, finds and deletes from every thread at once. Each thread
/// only deletes documents it inserted itself.
pub fn stress_mixed_operations(
    store: &Arc<DocumentStore>,
    config: &StressConfig,
) -> StressTestResult {
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let store = Arc::clone(store);
            let config = config.clone();
            thread::spawn(move || {
                let mut own = Vec::new();
                let mut successful = 0usize;
                let mut failed = 0usize;
                for n in 0..config.operations {
                    let ok = match n % 3 {
                        0 | 1 => store
                            .insert_json(&document(t, n, config.payload_size))
                            .map(|id| own.push(id))
                            .is_ok(),
                        _ => match own.pop() {
                            Some(id) => {
                                let id = id.to_string();
                                store.find(&id).is_ok() && store.delete(&id).is_ok()
                            }
                            None => true,
                        },
                    };
                    if ok {
                        successful += 1;
                    } else {
                        failed += 1;
                    }
                }
                (successful, failed)
            })
        })
        .collect();

    let mut successful = 0usize;
    let mut failed = 0usize;
    for handle in handles {
        match handle.join() {
            Ok((s, f)) => {
                successful += s;
                failed += f;
            }
            Err(_) => failed += config.operations,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
