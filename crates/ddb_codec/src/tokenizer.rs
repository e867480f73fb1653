//! Incremental JSON tokenizer.
//!
//! [`StreamTokenizer`] consumes one byte at a time and reports structural
//! [`Event`]s as soon as they are known. It never needs the whole input in
//! memory: string and primitive contents are buffered only until the token
//! ends. Every event carries absolute byte offsets so callers can go back to
//! the source and patch or copy exact ranges.
//!
//! The grammar is strict JSON: keys must be strings, primitives must be
//! numbers or `true`/`false`/`null`, and control characters inside strings
//! are rejected. Escape sequences are validated but not decoded; event text
//! is the raw source between the quotes.

use crate::error::{CodecError, CodecResult};

/// Default maximum nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// A half-open byte range `[start, end)` in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// First byte of the range.
    pub start: u64,
    /// One past the last byte of the range.
    pub end: u64,
}

impl Span {
    /// Creates a span.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Length of the span in bytes.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Returns true if the span covers no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A structural event produced by the tokenizer.
///
/// Container events carry the offset of their bracket. String and key
/// spans cover the content between the quotes; primitive spans cover the
/// bare token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event<'a> {
    /// `[` at `offset`.
    ArrayStart {
        /// Offset of the bracket.
        offset: u64,
    },
    /// `]` at `offset`.
    ArrayEnd {
        /// Offset of the bracket.
        offset: u64,
    },
    /// `{` at `offset`.
    ObjectStart {
        /// Offset of the brace.
        offset: u64,
    },
    /// `}` at `offset`.
    ObjectEnd {
        /// Offset of the brace.
        offset: u64,
    },
    /// An object key.
    Key {
        /// Raw key text without quotes.
        text: &'a [u8],
        /// Span of the key text.
        span: Span,
    },
    /// A string value.
    String {
        /// Raw string text without quotes.
        text: &'a [u8],
        /// Span of the string text.
        span: Span,
    },
    /// A number, `true`, `false` or `null`.
    Primitive {
        /// Raw token text.
        text: &'a [u8],
        /// Span of the token.
        span: Span,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Object,
    Array,
}

/// What the grammar allows next, ignoring whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    /// Any value (root, after `:` or after `,` in an array).
    Value,
    /// A value or `]` (right after `[`).
    ValueOrClose,
    /// A key or `}` (right after `{`).
    KeyOrClose,
    /// A key (after `,` in an object).
    Key,
    /// `:` after a key.
    Colon,
    /// `,` or the closing bracket of the current container.
    CommaOrClose,
    /// Only whitespace after the root value.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    None,
    Backslash,
    Unicode(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexeme {
    None,
    Str { key: bool, escape: Escape },
    Primitive,
}

/// Byte-at-a-time JSON tokenizer.
///
/// # Example
///
/// ```
/// use ddb_codec::{Event, StreamTokenizer, CodecError};
///
/// let mut tokenizer = StreamTokenizer::new();
/// let mut keys = Vec::new();
/// for &byte in br#"{"a":1}"# {
///     tokenizer
///         .feed(byte, |event| {
///             if let Event::Key { text, .. } = event {
///                 keys.push(text.to_vec());
///             }
///             Ok::<(), CodecError>(())
///         })
///         .unwrap();
/// }
/// tokenizer.finish(|_| Ok::<(), CodecError>(())).unwrap();
/// assert_eq!(keys, vec![b"a".to_vec()]);
/// ```
#[derive(Debug)]
pub struct StreamTokenizer {
    offset: u64,
    stack: Vec<Container>,
    expect: Expect,
    lexeme: Lexeme,
    lexeme_start: u64,
    buf: Vec<u8>,
    max_depth: usize,
}

impl Default for StreamTokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamTokenizer {
    /// Creates a tokenizer positioned at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self {
            offset: 0,
            stack: Vec::new(),
            expect: Expect::Value,
            lexeme: Lexeme::None,
            lexeme_start: 0,
            buf: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the maximum nesting depth.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Offset of the next byte to be fed.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns true once a complete root value has been read.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.expect == Expect::End
    }

    /// Returns true if no value has been started yet.
    #[must_use]
    pub fn is_pristine(&self) -> bool {
        self.expect == Expect::Value && self.stack.is_empty() && self.lexeme == Lexeme::None
    }

    /// Feeds every byte of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns the first tokenizer or sink error.
    pub fn feed_slice<E, F>(&mut self, bytes: &[u8], mut emit: F) -> Result<(), E>
    where
        E: From<CodecError>,
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        for &byte in bytes {
            self.feed(byte, &mut emit)?;
        }
        Ok(())
    }

    /// Feeds one byte, calling `emit` for every event it completes.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`] (converted into `E`) if the byte is not
    /// valid at this position, or any error returned by `emit`.
    pub fn feed<E, F>(&mut self, byte: u8, mut emit: F) -> Result<(), E>
    where
        E: From<CodecError>,
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        let offset = self.offset;
        self.offset += 1;

        match self.lexeme {
            Lexeme::Str { key, escape } => return self.string_byte(byte, offset, key, escape, &mut emit),
            Lexeme::Primitive => {
                if is_primitive_byte(byte) {
                    self.buf.push(byte);
                    return Ok(());
                }
                if !is_whitespace(byte) && !matches!(byte, b',' | b']' | b'}') {
                    return Err(CodecError::UnexpectedByte { byte, offset }.into());
                }
                self.end_primitive(offset, &mut emit)?;
            }
            Lexeme::None => {}
        }

        self.structural_byte(byte, offset, &mut emit)
    }

    /// Signals end of input.
    ///
    /// A trailing root primitive is flushed. Input that contained nothing
    /// but whitespace is accepted; check [`Self::is_complete`] to tell the
    /// two apart.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnexpectedEof`] if a value is still open.
    pub fn finish<E, F>(&mut self, mut emit: F) -> Result<(), E>
    where
        E: From<CodecError>,
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        if self.lexeme == Lexeme::Primitive {
            self.end_primitive(self.offset, &mut emit)?;
        }
        if self.lexeme != Lexeme::None || !self.stack.is_empty() {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
            }
            .into());
        }
        if !self.is_complete() && !self.is_pristine() {
            return Err(CodecError::UnexpectedEof {
                offset: self.offset,
            }
            .into());
        }
        Ok(())
    }

    fn structural_byte<E, F>(&mut self, byte: u8, offset: u64, emit: &mut F) -> Result<(), E>
    where
        E: From<CodecError>,
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        if is_whitespace(byte) {
            return Ok(());
        }
        if self.expect == Expect::End {
            return Err(CodecError::TrailingData { offset }.into());
        }

        match byte {
            b'{' | b'[' => {
                if !matches!(self.expect, Expect::Value | Expect::ValueOrClose) {
                    return Err(CodecError::UnexpectedByte { byte, offset }.into());
                }
                if self.stack.len() >= self.max_depth {
                    return Err(CodecError::DepthLimitExceeded {
                        limit: self.max_depth,
                    }
                    .into());
                }
                if byte == b'{' {
                    self.stack.push(Container::Object);
                    self.expect = Expect::KeyOrClose;
                    emit(Event::ObjectStart { offset })
                } else {
                    self.stack.push(Container::Array);
                    self.expect = Expect::ValueOrClose;
                    emit(Event::ArrayStart { offset })
                }
            }
            b'}' | b']' => {
                let wanted = if byte == b'}' {
                    Container::Object
                } else {
                    Container::Array
                };
                let Some(&top) = self.stack.last() else {
                    return Err(CodecError::DepthUnderflow { offset }.into());
                };
                if top != wanted {
                    return Err(CodecError::MismatchedClose { offset }.into());
                }
                let allowed = match wanted {
                    Container::Object => matches!(self.expect, Expect::KeyOrClose | Expect::CommaOrClose),
                    Container::Array => matches!(self.expect, Expect::ValueOrClose | Expect::CommaOrClose),
                };
                if !allowed {
                    return Err(CodecError::UnexpectedByte { byte, offset }.into());
                }
                self.stack.pop();
                self.value_done();
                if wanted == Container::Object {
                    emit(Event::ObjectEnd { offset })
                } else {
                    emit(Event::ArrayEnd { offset })
                }
            }
            b'"' => {
                let key = match self.expect {
                    Expect::KeyOrClose | Expect::Key => true,
                    Expect::Value | Expect::ValueOrClose => false,
                    _ => return Err(CodecError::UnexpectedByte { byte, offset }.into()),
                };
                self.lexeme = Lexeme::Str {
                    key,
                    escape: Escape::None,
                };
                self.lexeme_start = offset + 1;
                self.buf.clear();
                Ok(())
            }
            b':' => {
                if self.expect != Expect::Colon {
                    return Err(CodecError::UnexpectedByte { byte, offset }.into());
                }
                self.expect = Expect::Value;
                Ok(())
            }
            b',' => {
                if self.expect != Expect::CommaOrClose {
                    return Err(CodecError::UnexpectedByte { byte, offset }.into());
                }
                self.expect = match self.stack.last() {
                    Some(Container::Object) => Expect::Key,
                    _ => Expect::Value,
                };
                Ok(())
            }
            b'-' | b'0'..=b'9' | b't' | b'f' | b'n' => {
                if !matches!(self.expect, Expect::Value | Expect::ValueOrClose) {
                    return Err(CodecError::UnexpectedByte { byte, offset }.into());
                }
                self.lexeme = Lexeme::Primitive;
                self.lexeme_start = offset;
                self.buf.clear();
                self.buf.push(byte);
                Ok(())
            }
            _ => Err(CodecError::UnexpectedByte { byte, offset }.into()),
        }
    }

    fn string_byte<E, F>(
        &mut self,
        byte: u8,
        offset: u64,
        key: bool,
        escape: Escape,
        emit: &mut F,
    ) -> Result<(), E>
    where
        E: From<CodecError>,
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        let next = match escape {
            Escape::Backslash => match byte {
                b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't' => Escape::None,
                b'u' => Escape::Unicode(4),
                _ => return Err(CodecError::InvalidString { offset }.into()),
            },
            Escape::Unicode(remaining) => {
                if !byte.is_ascii_hexdigit() {
                    return Err(CodecError::InvalidString { offset }.into());
                }
                if remaining == 1 {
                    Escape::None
                } else {
                    Escape::Unicode(remaining - 1)
                }
            }
            Escape::None => match byte {
                b'"' => {
                    self.lexeme = Lexeme::None;
                    let span = Span::new(self.lexeme_start, offset);
                    if key {
                        self.expect = Expect::Colon;
                        return emit(Event::Key {
                            text: &self.buf,
                            span,
                        });
                    }
                    self.value_done();
                    return emit(Event::String {
                        text: &self.buf,
                        span,
                    });
                }
                b'\\' => Escape::Backslash,
                0x00..=0x1f => return Err(CodecError::InvalidString { offset }.into()),
                _ => Escape::None,
            },
        };
        self.buf.push(byte);
        self.lexeme = Lexeme::Str { key, escape: next };
        Ok(())
    }

    fn end_primitive<E, F>(&mut self, end: u64, emit: &mut F) -> Result<(), E>
    where
        E: From<CodecError>,
        F: FnMut(Event<'_>) -> Result<(), E>,
    {
        self.lexeme = Lexeme::None;
        if !is_valid_primitive(&self.buf) {
            return Err(CodecError::InvalidPrimitive {
                offset: self.lexeme_start,
            }
            .into());
        }
        self.value_done();
        emit(Event::Primitive {
            text: &self.buf,
            span: Span::new(self.lexeme_start, end),
        })
    }

    fn value_done(&mut self) {
        self.expect = if self.stack.is_empty() {
            Expect::End
        } else {
            Expect::CommaOrClose
        };
    }
}

fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

fn is_primitive_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'+' | b'.')
}

/// Returns true if `text` is `true`, `false`, `null` or a JSON number.
#[must_use]
pub fn is_valid_primitive(text: &[u8]) -> bool {
    match text {
        b"true" | b"false" | b"null" => true,
        _ => is_json_number(text),
    }
}

fn is_json_number(text: &[u8]) -> bool {
    let mut i = 0;
    if text.get(i) == Some(&b'-') {
        i += 1;
    }
    match text.get(i) {
        Some(b'0') => i += 1,
        Some(b'1'..=b'9') => {
            while text.get(i).is_some_and(u8::is_ascii_digit) {
                i += 1;
            }
        }
        _ => return false,
    }
    if text.get(i) == Some(&b'.') {
        i += 1;
        let digits = i;
        while text.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == digits {
            return false;
        }
    }
    if matches!(text.get(i), Some(b'e' | b'E')) {
        i += 1;
        if matches!(text.get(i), Some(b'+' | b'-')) {
            i += 1;
        }
        let digits = i;
        while text.get(i).is_some_and(u8::is_ascii_digit) {
            i += 1;
        }
        if i == digits {
            return false;
        }
    }
    i == text.len()
}

/// Tokenizes a complete buffer and collects owned events.
///
/// Convenience for tests and small inputs.
///
/// # Errors
///
/// Returns the first tokenizer error, or [`CodecError::Empty`] if the
/// input holds no value.
pub fn tokenize(input: &[u8]) -> CodecResult<Vec<OwnedEvent>> {
    let mut tokenizer = StreamTokenizer::new();
    let mut events = Vec::new();
    let mut push = |event: Event<'_>| -> CodecResult<()> {
        events.push(OwnedEvent::from(event));
        Ok(())
    };
    tokenizer.feed_slice(input, &mut push)?;
    tokenizer.finish(&mut push)?;
    if !tokenizer.is_complete() {
        return Err(CodecError::Empty);
    }
    Ok(events)
}

/// Owned copy of an [`Event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedEvent {
    /// See [`Event::ArrayStart`].
    ArrayStart(u64),
    /// See [`Event::ArrayEnd`].
    ArrayEnd(u64),
    /// See [`Event::ObjectStart`].
    ObjectStart(u64),
    /// See [`Event::ObjectEnd`].
    ObjectEnd(u64),
    /// See [`Event::Key`].
    Key(Vec<u8>, Span),
    /// See [`Event::String`].
    String(Vec<u8>, Span),
    /// See [`Event::Primitive`].
    Primitive(Vec<u8>, Span),
}

impl From<Event<'_>> for OwnedEvent {
    fn from(event: Event<'_>) -> Self {
        match event {
            Event::ArrayStart { offset } => Self::ArrayStart(offset),
            Event::ArrayEnd { offset } => Self::ArrayEnd(offset),
            Event::ObjectStart { offset } => Self::ObjectStart(offset),
            Event::ObjectEnd { offset } => Self::ObjectEnd(offset),
            Event::Key { text, span } => Self::Key(text.to_vec(), span),
            Event::String { text, span } => Self::String(text.to_vec(), span),
            Event::Primitive { text, span } => Self::Primitive(text.to_vec(), span),
        }
    }
}
