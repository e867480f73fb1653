//! Cross-crate property and scenario tests for the document store.

use ddb_core::{DocumentId, DocumentStore, EMPTY_STORE};
use ddb_storage::InMemoryBackend;
use ddb_testkit::prelude::*;
use proptest::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::quick().to_proptest_config())]

    #[test]
    fn operation_sequences_match_model(ops in operation_sequence_strategy(1, 40)) {
        let store = TestStore::memory();
        let mut model = ModelStore::new();
        for op in &ops {
            model.apply(&store, op).map_err(|e| TestCaseError::fail(e))?;
            model.check_all(&store).map_err(|e| TestCaseError::fail(e))?;
        }
    }

    #[test]
    fn insert_then_find_returns_document((document, body) in document_body_strategy()) {
        let store = TestStore::memory();
        let id = store.insert_json(&body).unwrap();
        let found: serde_json::Value =
            serde_json::from_slice(&store.find(&id.to_string()).unwrap()).unwrap();
        prop_assert_eq!(found, with_id(&document, id));
    }

    #[test]
    fn identifiers_strictly_increase(count in 1usize..30, deletes in prop::collection::vec(any::<bool>(), 30)) {
        let store = TestStore::memory();
        let mut last = DocumentId::default();
        for (i, delete) in deletes.iter().take(count).enumerate() {
            let id = store.insert_json(format!("{{\"i\":{i}}}").as_bytes()).unwrap();
            prop_assert!(id > last);
            last = id;
            if *delete {
                store.delete(&id.to_string()).unwrap();
            }
        }
    }

    #[test]
    fn deleting_everything_leaves_empty_array(
        count in 1usize..20,
        order in prop::collection::vec(any::<usize>(), 20),
    ) {
        let store = scenarios::populated_store(count);
        let mut remaining: Vec<u64> = (1..=count as u64).collect();
        for pick in order.iter().take(count) {
            let id = remaining.remove(pick % remaining.len());
            store.delete(&DocumentId::new(id).to_string()).unwrap();
        }
        prop_assert_eq!(store.contents(), EMPTY_STORE.to_vec());
    }

    #[test]
    fn compaction_preserves_findable_documents(
        count in 2usize..20,
        deleted in prop::collection::vec(any::<bool>(), 20),
    ) {
        let store = scenarios::populated_store(count);
        let mut live = Vec::new();
        for id in 1..=count as u64 {
            if deleted[id as usize - 1] {
                store.delete(&DocumentId::new(id).to_string()).unwrap();
            } else {
                live.push(id);
            }
        }

        let before: Vec<_> = live
            .iter()
            .map(|id| store.find(&DocumentId::new(*id).to_string()).unwrap())
            .collect();
        let stats = store.compact().unwrap();
        prop_assert!(stats.bytes_after <= stats.bytes_before);

        let after: Vec<_> = live
            .iter()
            .map(|id| store.find(&DocumentId::new(*id).to_string()).unwrap())
            .collect();
        prop_assert_eq!(before, after);

        let summary = store.stats().unwrap();
        prop_assert_eq!(summary.active, live.len());
        if live.is_empty() {
            prop_assert_eq!(store.contents(), EMPTY_STORE.to_vec());
        }
        prop_assert!(store.verify().unwrap().is_empty());
    }
}

#[test]
fn delete_absent_leaves_file_unchanged() {
    let store = scenarios::populated_store(3);
    let before = store.contents();

    for id in ["000000000000000000000009", "not-an-id", ""] {
        assert!(store.delete(id).is_err());
    }
    assert_eq!(store.contents(), before);
}

#[test]
fn delete_non_tail_then_rest_leaves_empty_array() {
    let store = scenarios::populated_store(4);
    store.delete("000000000000000000000002").unwrap();
    for id in [1u64, 3, 4] {
        store.delete(&DocumentId::new(id).to_string()).unwrap();
    }
    assert_eq!(store.contents(), b"[\n]");
}

#[test]
fn resync_recovers_highest_identifier() {
    let store = scenarios::populated_store(3);
    // a deleted tail stays as a tombstone and still counts
    store.delete("000000000000000000000003").unwrap();
    assert_eq!(store.resync().unwrap(), Some(DocumentId::new(4)));

    store.compact().unwrap();
    assert_eq!(store.resync().unwrap(), Some(DocumentId::new(3)));
    assert_eq!(store.insert_json(b"{}").unwrap(), DocumentId::new(3));
}

#[test]
fn exact_scenario() {
    let store = TestStore::memory();
    let first = store.insert_json(br#"{"a":1}"#).unwrap();
    let second = store.insert_json(br#"{"a":2}"#).unwrap();
    assert_eq!(first.to_string(), "000000000000000000000001");
    assert_eq!(second.to_string(), "000000000000000000000002");

    store.delete(&first.to_string()).unwrap();
    assert!(store.find(&first.to_string()).is_err());
    assert_eq!(
        store.find(&second.to_string()).unwrap(),
        br#"{"_id":"000000000000000000000002","a":2}"#
    );
    assert_eq!(
        store.contents(),
        b"[\n{\"s\":1,\"d\":{\"_id\":\"000000000000000000000002\",\"a\":2}}\n]"
    );
}

#[test]
fn reopen_from_bytes_recovers_sequence() {
    let store = scenarios::fragmented_store(5);
    let bytes = store.contents();

    let reopened =
        DocumentStore::open_with_backend(Box::new(InMemoryBackend::with_data(bytes)), test_config())
            .unwrap();
    // 5 was moved into the first slot and later deleted, so 4 is highest
    assert_eq!(reopened.stats().unwrap().next_id, Some(DocumentId::new(5)));
    assert!(reopened.find("000000000000000000000004").is_ok());
}

#[test]
fn concurrent_inserts_are_unique() {
    let store = std::sync::Arc::new(
        DocumentStore::open_with_backend(Box::new(InMemoryBackend::new()), test_config()).unwrap(),
    );
    let (result, ids) = stress_concurrent_inserts(&store, &StressConfig::default());
    result.print_summary("concurrent inserts");
    assert_eq!(result.failed_ops, 0);

    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len());
}
