//! Compact JSON serializer for token trees.

use crate::error::{CodecError, CodecResult};
use crate::tree::{NodeKind, TokenTree};

/// A key/value pair injected as the first field of the root object.
///
/// Both parts are written as JSON strings, verbatim between quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraField<'a> {
    /// Field name.
    pub key: &'a str,
    /// Field value.
    pub value: &'a str,
}

impl<'a> ExtraField<'a> {
    /// Creates an extra field.
    #[must_use]
    pub const fn new(key: &'a str, value: &'a str) -> Self {
        Self { key, value }
    }

    fn encoded_len(&self) -> usize {
        // "key":"value",
        self.key.len() + self.value.len() + 6
    }
}

/// Render `tree` as compact JSON.
///
/// String and primitive tokens are copied verbatim from `source`. When
/// `extra` is given and the root is an object, it becomes the first root
/// field and any root field with the same key is dropped.
///
/// # Errors
///
/// Returns [`CodecError::TooLarge`] if the worst-case output size exceeds
/// `capacity`. Nothing is written in that case.
pub fn render(
    tree: &TokenTree,
    source: &[u8],
    extra: Option<ExtraField<'_>>,
    capacity: usize,
) -> CodecResult<Vec<u8>> {
    let needed = source.len() + extra.map_or(0, |field| field.encoded_len());
    if needed > capacity {
        return Err(CodecError::TooLarge {
            needed,
            limit: capacity,
        });
    }
    let mut serializer = CompactSerializer::with_capacity(needed);
    serializer.write(tree, source, extra);
    Ok(serializer.into_bytes())
}

/// Writes token trees as compact JSON.
#[derive(Debug, Default)]
pub struct CompactSerializer {
    buffer: Vec<u8>,
}

impl CompactSerializer {
    /// Create a new serializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new serializer with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Append the rendering of `tree` to the buffer.
    pub fn write(&mut self, tree: &TokenTree, source: &[u8], extra: Option<ExtraField<'_>>) {
        if !tree.is_empty() {
            self.write_node(tree, source, 0, extra);
        }
    }

    /// Consume this serializer and return the bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the bytes written so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Writes the node at `index` and returns the index after its subtree.
    fn write_node(
        &mut self,
        tree: &TokenTree,
        source: &[u8],
        index: usize,
        extra: Option<ExtraField<'_>>,
    ) -> usize {
        let Some(node) = tree.node(index).copied() else {
            return index;
        };
        match node.kind {
            NodeKind::Primitive => {
                self.buffer.extend_from_slice(tree.text(source, index));
                index + 1
            }
            NodeKind::String => {
                self.write_quoted(tree.text(source, index));
                index + 1
            }
            NodeKind::Array => {
                self.buffer.push(b'[');
                let mut next = index + 1;
                for i in 0..node.size {
                    if i > 0 {
                        self.buffer.push(b',');
                    }
                    next = self.write_node(tree, source, next, None);
                }
                self.buffer.push(b']');
                next
            }
            NodeKind::Object => {
                self.buffer.push(b'{');
                let mut wrote_field = false;
                if let Some(field) = extra {
                    self.write_quoted(field.key.as_bytes());
                    self.buffer.push(b':');
                    self.write_quoted(field.value.as_bytes());
                    wrote_field = true;
                }
                let mut next = index + 1;
                for _ in 0..node.size {
                    let key = tree.text(source, next);
                    if extra.is_some_and(|field| field.key.as_bytes() == key) {
                        next = tree.skip(next);
                        continue;
                    }
                    if wrote_field {
                        self.buffer.push(b',');
                    }
                    self.write_quoted(key);
                    self.buffer.push(b':');
                    next = self.write_node(tree, source, next + 1, None);
                    wrote_field = true;
                }
                self.buffer.push(b'}');
                next
            }
        }
    }

    fn write_quoted(&mut self, text: &[u8]) {
        self.buffer.push(b'"');
        self.buffer.extend_from_slice(text);
        self.buffer.push(b'"');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ID: ExtraField<'static> = ExtraField::new("_id", "000000000000000000000001");

    fn render_str(source: &str, extra: Option<ExtraField<'_>>) -> String {
        let tree = TokenTree::parse(source.as_bytes(), 128).unwrap();
        String::from_utf8(render(&tree, source.as_bytes(), extra, 10240).unwrap()).unwrap()
    }

    #[test]
    fn strips_whitespace() {
        assert_eq!(
            render_str("{ \"a\" : [ 1, 2 , {} ],\n \"b\" : \"x y\" }", None),
            r#"{"a":[1,2,{}],"b":"x y"}"#
        );
    }

    #[test]
    fn extra_field_comes_first() {
        assert_eq!(
            render_str(r#"{"a":1}"#, Some(ID)),
            r#"{"_id":"000000000000000000000001","a":1}"#
        );
    }

    #[test]
    fn extra_field_in_empty_object() {
        assert_eq!(
            render_str("{ }", Some(ID)),
            r#"{"_id":"000000000000000000000001"}"#
        );
    }

    #[test]
    fn client_id_is_replaced() {
        assert_eq!(
            render_str(r#"{"_id":"mine","a":1,"n":{"_id":"kept"}}"#, Some(ID)),
            r#"{"_id":"000000000000000000000001","a":1,"n":{"_id":"kept"}}"#
        );
        assert_eq!(
            render_str(r#"{"a":1,"_id":{"x":[1]}}"#, Some(ID)),
            r#"{"_id":"000000000000000000000001","a":1}"#
        );
    }

    #[test]
    fn escapes_and_primitives_copied_verbatim() {
        assert_eq!(
            render_str(r#"[ "a\"bé", -1.5e3, true, false, null, [] ]"#, None),
            r#"["a\"bé",-1.5e3,true,false,null,[]]"#
        );
    }

    #[test]
    fn extra_ignored_for_non_object_root() {
        assert_eq!(render_str("[1]", Some(ID)), "[1]");
    }

    #[test]
    fn output_matches_serde_json() {
        let source = r#"{"name": "Ada", "tags": ["x", "y"], "age": 36, "nested": {"ok": true}}"#;
        let rendered = render_str(source, Some(ID));
        let ours: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let mut expected: serde_json::Value = serde_json::from_str(source).unwrap();
        expected["_id"] = serde_json::Value::from("000000000000000000000001");
        assert_eq!(ours, expected);
    }

    #[test]
    fn too_large_is_reported_before_writing() {
        let source = br#"{"a":1}"#;
        let tree = TokenTree::parse(source, 8).unwrap();
        // 7 source bytes + 3 + 24 + 6
        assert_eq!(
            render(&tree, source, Some(ID), 39),
            Err(CodecError::TooLarge {
                needed: 40,
                limit: 39
            })
        );
        assert!(render(&tree, source, Some(ID), 40).is_ok());
    }

    fn json_value() -> impl Strategy<Value = serde_json::Value> {
        use serde_json::Value;
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            "\\PC{0,8}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 32, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn pretty_input_renders_like_compact_serde(value in json_value()) {
            let pretty = serde_json::to_vec_pretty(&value).unwrap();
            let tree = TokenTree::parse(&pretty, 4096).unwrap();
            let rendered = render(&tree, &pretty, None, 64 * 1024).unwrap();
            prop_assert_eq!(rendered, serde_json::to_vec(&value).unwrap());
        }
    }
}
