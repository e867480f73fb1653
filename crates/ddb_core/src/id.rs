//! Document identifiers.

use std::fmt;
use std::str::FromStr;

/// Length of an identifier in its textual form.
pub const ID_LENGTH: usize = 24;

/// A document identifier.
///
/// Identifiers are 64-bit sequence numbers written as 24 lowercase hex
/// digits, left-padded with zeros.
///
/// # Example
///
/// ```
/// use ddb_core::DocumentId;
///
/// let id = DocumentId::new(26);
/// assert_eq!(id.to_string(), "00000000000000000000001a");
/// assert_eq!(DocumentId::parse(b"00000000000000000000001a"), Some(id));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Creates an identifier from its sequence number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the sequence number.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parses hex text of any length.
    ///
    /// Returns `None` for empty input, non-hex characters, or values that
    /// do not fit in 64 bits.
    #[must_use]
    pub fn parse(text: &[u8]) -> Option<Self> {
        if text.is_empty() {
            return None;
        }
        let mut value: u64 = 0;
        for &byte in text {
            let digit = char::from(byte).to_digit(16)?;
            value = value.checked_mul(16)?.checked_add(u64::from(digit))?;
        }
        Some(Self(value))
    }

    /// Formats the identifier as its fixed-width text form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; ID_LENGTH] {
        let mut out = [b'0'; ID_LENGTH];
        let text = format!("{:024x}", self.0);
        out.copy_from_slice(&text.as_bytes()[..ID_LENGTH]);
        out
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:024x}", self.0)
    }
}

impl FromStr for DocumentId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.as_bytes()).ok_or(())
    }
}
