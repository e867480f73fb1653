//! Reference model for store behaviour.
//!
//! [`ModelStore`] tracks which documents should be findable and what the
//! next identifier should be, and [`ModelStore::apply`] runs one
//! [`StoreOperation`] against a real store and checks the outcome.

use crate::generators::StoreOperation;
use ddb_core::{CoreError, DocumentId, DocumentStore, ID_FIELD};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Expected state of a store.
#[derive(Debug, Default)]
pub struct ModelStore {
    /// Identifiers in insertion order, including deleted ones.
    inserted: Vec<DocumentId>,
    /// Documents that should be findable, with their injected `_id`.
    live: BTreeMap<DocumentId, Value>,
    /// Highest identifier ever issued.
    highest: u64,
}

impl ModelStore {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents that should be findable.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Returns the identifier the next insert should receive.
    pub fn expected_next_id(&self) -> DocumentId {
        DocumentId::new(self.highest + 1)
    }

    /// Applies `op` to `store` and checks the result against the model.
    pub fn apply(&mut self, store: &DocumentStore, op: &StoreOperation) -> Result<(), String> {
        match op {
            StoreOperation::Insert { document, body } => {
                let id = store
                    .insert_json(body)
                    .map_err(|e| format!("insert failed: {e}"))?;
                if id.as_u64() <= self.highest {
                    return Err(format!(
                        "identifier {id} not above previous highest {}",
                        self.highest
                    ));
                }
                self.highest = id.as_u64();
                self.inserted.push(id);
                self.live.insert(id, with_id(document, id));
                Ok(())
            }
            StoreOperation::Delete { index } => {
                let Some(id) = self.pick(*index) else {
                    return expect_not_found(store.delete(&DocumentId::new(1).to_string()).map(|_| ()));
                };
                let before = store.raw_contents().map_err(|e| e.to_string())?;
                let result = store.delete(&id.to_string()).map(|_| ());
                if self.live.remove(&id).is_some() {
                    result.map_err(|e| format!("delete of {id} failed: {e}"))
                } else {
                    expect_not_found(result)?;
                    let after = store.raw_contents().map_err(|e| e.to_string())?;
                    if before != after {
                        return Err(format!("delete of absent {id} changed the file"));
                    }
                    Ok(())
                }
            }
            StoreOperation::Find { index } => {
                let Some(id) = self.pick(*index) else {
                    return Ok(());
                };
                self.check_find(store, id)
            }
            StoreOperation::Resync => {
                let next = store
                    .resync()
                    .map_err(|e| e.to_string())?
                    .ok_or("resync reported an exhausted sequence")?;
                // resync only sees identifiers still present in the file
                if next > self.expected_next_id() {
                    return Err(format!(
                        "resync moved the sequence past {}: {next}",
                        self.expected_next_id()
                    ));
                }
                if let Some(max_live) = self.live.keys().next_back() {
                    if next.as_u64() <= max_live.as_u64() {
                        return Err(format!("resync returned {next}, below live {max_live}"));
                    }
                }
                self.highest = next.as_u64() - 1;
                Ok(())
            }
            StoreOperation::Compact => {
                store.compact().map_err(|e| format!("compact failed: {e}"))?;
                Ok(())
            }
        }
    }

    /// Checks that every live document is findable with its exact content
    /// and that the file verifies cleanly.
    pub fn check_all(&self, store: &DocumentStore) -> Result<(), String> {
        for id in self.live.keys() {
            self.check_find(store, *id)?;
        }
        let issues = store.verify().map_err(|e| e.to_string())?;
        if !issues.is_empty() {
            return Err(format!("verify reported {issues:?}"));
        }
        let stats = store.stats().map_err(|e| e.to_string())?;
        if stats.active != self.live.len() {
            return Err(format!(
                "{} active records, expected {}",
                stats.active,
                self.live.len()
            ));
        }
        Ok(())
    }

    fn pick(&self, index: usize) -> Option<DocumentId> {
        if self.inserted.is_empty() {
            return None;
        }
        Some(self.inserted[index % self.inserted.len()])
    }

    fn check_find(&self, store: &DocumentStore, id: DocumentId) -> Result<(), String> {
        let result = store.find(&id.to_string());
        match self.live.get(&id) {
            Some(expected) => {
                let bytes = result.map_err(|e| format!("find of {id} failed: {e}"))?;
                let found: Value = serde_json::from_slice(&bytes)
                    .map_err(|e| format!("find of {id} returned invalid JSON: {e}"))?;
                if &found != expected {
                    return Err(format!("find of {id} returned {found}, expected {expected}"));
                }
                Ok(())
            }
            None => expect_not_found(result.map(|_| ())),
        }
    }
}

/// Returns `document` with `_id` set to `id`.
pub fn with_id(document: &Map<String, Value>, id: DocumentId) -> Value {
    let mut fields = document.clone();
    fields.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    Value::Object(fields)
}

fn expect_not_found(result: Result<(), CoreError>) -> Result<(), String> {
    match result {
        Err(CoreError::NotFound { .. }) => Ok(()),
        Err(other) => Err(format!("expected NotFound, got {other}")),
        Ok(()) => Err("expected NotFound, operation succeeded".to_string()),
    }
}
