//! Property-based test generators using proptest.
//!
//! Provides strategies for generating JSON documents and operation
//! sequences that the store accepts.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating field names. Never produces `_id`.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,11}").expect("Invalid regex")
}

/// Strategy for generating string values, including characters that
/// need escaping.
pub fn string_value_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[ -~]{0,16}").expect("Invalid regex"),
        prop::string::string_regex("\\PC{0,8}").expect("Invalid regex"),
        Just("quote \" backslash \\ newline \n tab \t".to_string()),
    ]
}

/// Strategy for generating scalar JSON values.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        string_value_strategy().prop_map(Value::String),
    ]
}

/// Strategy for generating JSON values nested up to three levels deep.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    scalar_value_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(|fields| Value::Object(fields.into_iter().collect())),
        ]
    })
}

/// Strategy for generating documents: JSON objects without an `_id`
/// field.
pub fn document_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(field_name_strategy(), json_value_strategy(), 0..6)
        .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for generating request bodies: a document serialized either
/// compactly or pretty-printed.
pub fn document_body_strategy() -> impl Strategy<Value = (Map<String, Value>, Vec<u8>)> {
    (document_strategy(), any::<bool>()).prop_map(|(document, pretty)| {
        let value = Value::Object(document.clone());
        let body = if pretty {
            serde_json::to_vec_pretty(&value)
        } else {
            serde_json::to_vec(&value)
        }
        .expect("Documents always serialize");
        (document, body)
    })
}

/// An operation applied to a store in property tests.
///
/// Operations that target a document name it by position among the
/// documents inserted so far, wrapped around the count.
#[derive(Debug, Clone)]
pub enum StoreOperation {
    /// Insert a document.
    Insert {
        /// The document fields.
        document: Map<String, Value>,
        /// Serialized request body.
        body: Vec<u8>,
    },
    /// Delete a previously inserted document.
    Delete {
        /// Position among inserted documents.
        index: usize,
    },
    /// Find a previously inserted document.
    Find {
        /// Position among inserted documents.
        index: usize,
    },
    /// Recover the identifier sequence from the file.
    Resync,
    /// Compact the store file.
    Compact,
}

/// Strategy for generating store operations.
pub fn store_operation_strategy() -> impl Strategy<Value = StoreOperation> {
    prop_oneof![
        4 => document_body_strategy()
            .prop_map(|(document, body)| StoreOperation::Insert { document, body }),
        2 => any::<usize>().prop_map(|index| StoreOperation::Delete { index }),
        2 => any::<usize>().prop_map(|index| StoreOperation::Find { index }),
        1 => Just(StoreOperation::Resync),
        1 => Just(StoreOperation::Compact),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<StoreOperation>> {
    prop::collection::vec(store_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn field_names_never_collide_with_id(name in field_name_strategy()) {
            prop_assert_ne!(name.as_str(), "_id");
            prop_assert!(!name.is_empty());
        }

        #[test]
        fn document_bodies_parse_back(
            (document, body) in document_body_strategy()
        ) {
            let parsed: Value = serde_json::from_slice(&body).unwrap();
            prop_assert_eq!(parsed, Value::Object(document));
        }
    }
}
