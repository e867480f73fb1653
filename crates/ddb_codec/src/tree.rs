//! Bounded token tree.
//!
//! A [`TokenTree`] is a flat, pre-order arena of [`Node`]s built from
//! tokenizer events. Object keys are `String` nodes with `size == 1`, each
//! followed by its value subtree. Object `size` counts key/value pairs and
//! array `size` counts elements.

use crate::error::{CodecError, CodecResult};
use crate::tokenizer::{Event, Span, StreamTokenizer};

/// Default node capacity for request bodies.
pub const DEFAULT_MAX_TOKENS: usize = 128;

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// `{...}`
    Object,
    /// `[...]`
    Array,
    /// A quoted string (value or key).
    String,
    /// A number or literal.
    Primitive,
}

/// One node of a [`TokenTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Node kind.
    pub kind: NodeKind,
    /// Source span: whole bracketed range for containers, quoted content
    /// for strings, bare token for primitives.
    pub span: Span,
    /// Child count (pairs for objects, elements for arrays, 1 for keys).
    pub size: usize,
    /// Index of the parent node: the container, or the key for object
    /// values.
    pub parent: Option<usize>,
}

impl Node {
    /// Returns true if this node is an object key.
    #[must_use]
    pub fn is_key(&self) -> bool {
        self.kind == NodeKind::String && self.size == 1
    }
}

/// Flat pre-order token tree over a borrowed source buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTree {
    nodes: Vec<Node>,
}

impl TokenTree {
    /// Tokenizes `source` into a tree of at most `max_tokens` nodes.
    ///
    /// # Errors
    ///
    /// - [`CodecError::TooManyTokens`] if the arena would overflow
    /// - [`CodecError::InvalidUtf8`] if `source` is not UTF-8
    /// - [`CodecError::Empty`] if the input holds no value
    /// - any tokenizer error for malformed input
    pub fn parse(source: &[u8], max_tokens: usize) -> CodecResult<Self> {
        let mut builder = TreeBuilder {
            nodes: Vec::new(),
            open: Vec::new(),
            pending_key: None,
            max_tokens,
        };
        std::str::from_utf8(source).map_err(|err| CodecError::InvalidUtf8 {
            offset: err.valid_up_to() as u64,
        })?;
        let mut tokenizer = StreamTokenizer::new();
        tokenizer.feed_slice(source, |event| builder.on_event(event))?;
        tokenizer.finish(|event| builder.on_event(event))?;
        if !tokenizer.is_complete() {
            return Err(CodecError::Empty);
        }
        Ok(Self {
            nodes: builder.nodes,
        })
    }

    /// All nodes in pre-order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at `index`.
    #[must_use]
    pub fn node(&self, index: usize) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Option<&Node> {
        self.nodes.first()
    }

    /// Returns true if the root value is an object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.root().is_some_and(|root| root.kind == NodeKind::Object)
    }

    /// Source bytes covered by the node at `index`.
    #[must_use]
    pub fn text<'a>(&self, source: &'a [u8], index: usize) -> &'a [u8] {
        self.nodes
            .get(index)
            .and_then(|node| source.get(node.span.start as usize..node.span.end as usize))
            .unwrap_or_default()
    }

    /// Index one past the subtree rooted at `index`.
    #[must_use]
    pub fn skip(&self, index: usize) -> usize {
        let Some(node) = self.nodes.get(index) else {
            return index;
        };
        match node.kind {
            NodeKind::String | NodeKind::Primitive if node.is_key() => self.skip(index + 1),
            NodeKind::String | NodeKind::Primitive => index + 1,
            NodeKind::Object | NodeKind::Array => {
                let mut next = index + 1;
                for _ in 0..node.size {
                    next = self.skip(next);
                }
                next
            }
        }
    }

    /// Finds the value stored under `key` directly inside the object at
    /// `object`, returning the value's node index.
    #[must_use]
    pub fn get_by_key(&self, source: &[u8], object: usize, key: &str) -> Option<usize> {
        let node = self.nodes.get(object)?;
        if node.kind != NodeKind::Object {
            return None;
        }
        let mut index = object + 1;
        for _ in 0..node.size {
            if self.text(source, index) == key.as_bytes() {
                return Some(index + 1);
            }
            index = self.skip(index);
        }
        None
    }

    /// Returns the raw text of a string value stored under `key` in the
    /// root object.
    #[must_use]
    pub fn root_string<'a>(&self, source: &'a [u8], key: &str) -> Option<&'a [u8]> {
        let value = self.get_by_key(source, 0, key)?;
        match self.nodes.get(value)?.kind {
            NodeKind::String => Some(self.text(source, value)),
            _ => None,
        }
    }
}

struct TreeBuilder {
    nodes: Vec<Node>,
    open: Vec<usize>,
    pending_key: Option<usize>,
    max_tokens: usize,
}

impl TreeBuilder {
    fn on_event(&mut self, event: Event<'_>) -> CodecResult<()> {
        match event {
            Event::ObjectStart { offset } => {
                let index = self.push_value(NodeKind::Object, Span::new(offset, offset + 1))?;
                self.open.push(index);
            }
            Event::ArrayStart { offset } => {
                let index = self.push_value(NodeKind::Array, Span::new(offset, offset + 1))?;
                self.open.push(index);
            }
            Event::ObjectEnd { offset } | Event::ArrayEnd { offset } => {
                if let Some(index) = self.open.pop() {
                    self.nodes[index].span.end = offset + 1;
                }
            }
            Event::Key { span, .. } => {
                let parent = self.open.last().copied();
                self.reserve()?;
                if let Some(object) = parent {
                    self.nodes[object].size += 1;
                }
                self.nodes.push(Node {
                    kind: NodeKind::String,
                    span,
                    size: 1,
                    parent,
                });
                self.pending_key = Some(self.nodes.len() - 1);
            }
            Event::String { span, .. } => {
                self.push_value(NodeKind::String, span)?;
            }
            Event::Primitive { span, .. } => {
                self.push_value(NodeKind::Primitive, span)?;
            }
        }
        Ok(())
    }

    fn push_value(&mut self, kind: NodeKind, span: Span) -> CodecResult<usize> {
        self.reserve()?;
        let parent = match self.pending_key.take() {
            Some(key) => Some(key),
            None => {
                let container = self.open.last().copied();
                if let Some(array) = container {
                    self.nodes[array].size += 1;
                }
                container
            }
        };
        self.nodes.push(Node {
            kind,
            span,
            size: 0,
            parent,
        });
        Ok(self.nodes.len() - 1)
    }

    fn reserve(&self) -> CodecResult<()> {
        if self.nodes.len() >= self.max_tokens {
            return Err(CodecError::TooManyTokens {
                limit: self.max_tokens,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_invalid_utf8() {
        let source = b"{\"a\":\"\xff\xfe\"}";
        assert_eq!(
            TokenTree::parse(source, 64).unwrap_err(),
            CodecError::InvalidUtf8 { offset: 6 }
        );
        assert!(TokenTree::parse("{\"a\":\"é\"}".as_bytes(), 64).is_ok());
    }

    #[test]
    fn parse_nested_document() {
        let source = br#"{"a": [1, {"b": null}], "c": "x"}"#;
        let tree = TokenTree::parse(source, 64).unwrap();
        let kinds: Vec<_> = tree.nodes().iter().map(|n| n.kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Object,
                NodeKind::String,
                NodeKind::Array,
                NodeKind::Primitive,
                NodeKind::Object,
                NodeKind::String,
                NodeKind::Primitive,
                NodeKind::String,
                NodeKind::String,
            ]
        );
        assert_eq!(tree.nodes()[0].size, 2);
        assert_eq!(tree.nodes()[2].size, 2);
        assert_eq!(tree.nodes()[4].size, 1);
        assert_eq!(tree.nodes()[0].span, Span::new(0, source.len() as u64));
        assert_eq!(tree.text(source, 4), br#"{"b": null}"#);
        assert_eq!(tree.skip(0), tree.len());
        assert_eq!(tree.skip(1), 7);
        assert_eq!(tree.nodes()[2].parent, Some(1));
        assert_eq!(tree.nodes()[3].parent, Some(2));
    }

    #[test]
    fn get_by_key_only_searches_direct_children() {
        let source = br#"{"inner": {"_id": "nested"}, "_id": "top"}"#;
        let tree = TokenTree::parse(source, 64).unwrap();
        assert_eq!(tree.root_string(source, "_id"), Some(&b"top"[..]));
        assert_eq!(tree.root_string(source, "missing"), None);
    }

    #[test]
    fn root_string_rejects_non_strings() {
        let source = br#"{"_id": 12}"#;
        let tree = TokenTree::parse(source, 8).unwrap();
        assert!(tree.get_by_key(source, 0, "_id").is_some());
        assert_eq!(tree.root_string(source, "_id"), None);
    }

    #[test]
    fn capacity_is_enforced() {
        let source = br#"{"a":1,"b":2}"#;
        assert!(TokenTree::parse(source, 5).is_ok());
        assert_eq!(
            TokenTree::parse(source, 4),
            Err(CodecError::TooManyTokens { limit: 4 })
        );
    }

    #[test]
    fn root_kind() {
        assert!(TokenTree::parse(b"{}", 4).unwrap().is_object());
        assert!(!TokenTree::parse(b"[]", 4).unwrap().is_object());
        assert!(!TokenTree::parse(b"\"s\"", 4).unwrap().is_object());
    }

    #[test]
    fn empty_and_malformed_inputs() {
        assert_eq!(TokenTree::parse(b"", 4), Err(CodecError::Empty));
        assert!(TokenTree::parse(b"{\"a\":}", 4).is_err());
        assert!(TokenTree::parse(b"{\"a\":1", 4).is_err());
    }
}
