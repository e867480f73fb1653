//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while tokenizing or serializing JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A byte that is not valid at this position.
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte {
        /// The offending byte.
        byte: u8,
        /// Offset of the byte in the input.
        offset: u64,
    },

    /// Input ended in the middle of a value.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof {
        /// Offset where the input ended.
        offset: u64,
    },

    /// A closing bracket with no open container.
    #[error("closing bracket at offset {offset} has no open container")]
    DepthUnderflow {
        /// Offset of the closing bracket.
        offset: u64,
    },

    /// A closing bracket that does not match the open container.
    #[error("mismatched closing bracket at offset {offset}")]
    MismatchedClose {
        /// Offset of the closing bracket.
        offset: u64,
    },

    /// A bare token that is neither a number nor a literal.
    #[error("invalid primitive at offset {offset}")]
    InvalidPrimitive {
        /// Start offset of the primitive.
        offset: u64,
    },

    /// Malformed escape sequence or control character inside a string.
    #[error("invalid string content at offset {offset}")]
    InvalidString {
        /// Offset of the offending byte.
        offset: u64,
    },

    /// The input is not valid UTF-8.
    #[error("invalid UTF-8 at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the first byte that is not part of a valid sequence.
        offset: u64,
    },

    /// Non-whitespace input after the root value.
    #[error("trailing data at offset {offset}")]
    TrailingData {
        /// Offset of the first trailing byte.
        offset: u64,
    },

    /// Input contained no value at all.
    #[error("empty input")]
    Empty,

    /// Nesting is deeper than the tokenizer allows.
    #[error("nesting depth exceeds limit of {limit}")]
    DepthLimitExceeded {
        /// Maximum nesting depth.
        limit: usize,
    },

    /// The token tree ran out of node capacity.
    #[error("too many tokens: limit is {limit}")]
    TooManyTokens {
        /// Maximum number of nodes.
        limit: usize,
    },

    /// Serialized output would exceed the configured capacity.
    #[error("output too large: needs up to {needed} bytes, limit is {limit}")]
    TooLarge {
        /// Upper bound of the output size.
        needed: usize,
        /// Configured capacity.
        limit: usize,
    },
}

impl CodecError {
    /// Returns true if the error describes malformed input rather than a
    /// capacity limit.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        !matches!(
            self,
            Self::TooManyTokens { .. } | Self::TooLarge { .. } | Self::DepthLimitExceeded { .. }
        )
    }
}
