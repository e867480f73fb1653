//! # DDB Codec
//!
//! Streaming JSON tokenizer, token tree and compact serializer for DDB.
//!
//! This crate provides the JSON handling used by the store:
//! - [`StreamTokenizer`] walks bytes one at a time and reports structural
//!   events with absolute byte offsets. The storage engine uses it to scan
//!   the store file without loading it.
//! - [`TokenTree`] is a bounded arena built from those events for request
//!   bodies.
//! - [`render`] re-emits a tree as compact JSON, optionally injecting one
//!   extra field at the front of the root object.
//!
//! ## Usage
//!
//! ```
//! use ddb_codec::{render, ExtraField, TokenTree};
//!
//! let body = br#"{ "a" : 1 }"#;
//! let tree = TokenTree::parse(body, 128).unwrap();
//! let out = render(&tree, body, Some(ExtraField::new("_id", "7")), 1024).unwrap();
//! assert_eq!(out, br#"{"_id":"7","a":1}"#);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod serializer;
mod tokenizer;
mod tree;

pub use error::{CodecError, CodecResult};
pub use serializer::{render, CompactSerializer, ExtraField};
pub use tokenizer::{
    is_valid_primitive, tokenize, Event, OwnedEvent, Span, StreamTokenizer, DEFAULT_MAX_DEPTH,
};
pub use tree::{Node, NodeKind, TokenTree, DEFAULT_MAX_TOKENS};
