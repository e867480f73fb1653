//! Container record layout.
//!
//! The store file is a JSON array of container records:
//!
//! ```text
//! [
//! {"s":1,"d":{"_id":"000000000000000000000001","a":1}},
//! {"s":0,"d":{"_id":"000000000000000000000002","a":2}}
//! ]
//! ```
//!
//! `s` is a single digit at a fixed offset from the record start so a
//! delete can flip it with a one-byte write.

/// Contents of a store with no records.
pub const EMPTY_STORE: &[u8] = b"[\n]";

/// Bytes that close the record array.
pub const ARRAY_CLOSE: &[u8] = b"\n]";

/// Offset of the status digit from the start of a record.
pub const STATUS_OFFSET: u64 = 5;

/// Status byte of an active record.
pub const STATUS_ACTIVE: u8 = b'1';

/// Status byte of a tombstoned record.
pub const STATUS_TOMBSTONED: u8 = b'0';

const RECORD_PREFIX: &[u8] = b"{\"s\":1,\"d\":";

/// Wraps a rendered document in an active container record.
#[must_use]
pub fn encode_record(document: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(RECORD_PREFIX.len() + document.len() + 1);
    out.extend_from_slice(RECORD_PREFIX);
    out.extend_from_slice(document);
    out.push(b'}');
    out
}

/// Status of a container record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// `s` is `0`, or the record has no status at all.
    Tombstoned,
    /// `s` is `1`, or its value has no leading integer.
    Active,
    /// Any other integer.
    Unknown(i64),
}

impl RecordStatus {
    /// Interprets the raw text of a status primitive.
    ///
    /// Only the leading integer (optional sign, then digits) is read and the
    /// rest is ignored. Text without a leading integer counts as active.
    #[must_use]
    pub fn from_primitive(text: &[u8]) -> Self {
        match leading_integer(text) {
            Some(0) => Self::Tombstoned,
            Some(1) | None => Self::Active,
            Some(other) => Self::Unknown(other),
        }
    }

    /// Returns true for active records.
    #[must_use]
    pub fn is_active(&self) -> bool {
        *self == Self::Active
    }

    /// Returns true for tombstoned records.
    #[must_use]
    pub fn is_tombstoned(&self) -> bool {
        *self == Self::Tombstoned
    }
}

fn leading_integer(text: &[u8]) -> Option<i64> {
    let (negative, digits) = match text.first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let end = digits
        .iter()
        .position(|byte| !byte.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let mut value: i64 = 0;
    for &byte in &digits[..end] {
        value = value
            .checked_mul(10)?
            .checked_add(i64::from(byte - b'0'))?;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_byte_sits_at_fixed_offset() {
        let record = encode_record(br#"{"_id":"x"}"#);
        assert_eq!(record, br#"{"s":1,"d":{"_id":"x"}}"#);
        assert_eq!(record[STATUS_OFFSET as usize], STATUS_ACTIVE);
    }

    #[test]
    fn status_from_primitive() {
        assert_eq!(RecordStatus::from_primitive(b"0"), RecordStatus::Tombstoned);
        assert_eq!(RecordStatus::from_primitive(b"1"), RecordStatus::Active);
        assert_eq!(RecordStatus::from_primitive(b"-0"), RecordStatus::Tombstoned);
        assert_eq!(RecordStatus::from_primitive(b"1.5"), RecordStatus::Active);
        assert_eq!(RecordStatus::from_primitive(b"0e3"), RecordStatus::Tombstoned);
        assert_eq!(RecordStatus::from_primitive(b"7"), RecordStatus::Unknown(7));
        assert_eq!(RecordStatus::from_primitive(b"-2"), RecordStatus::Unknown(-2));
    }

    #[test]
    fn unparseable_status_defaults_to_active() {
        assert_eq!(RecordStatus::from_primitive(b"true"), RecordStatus::Active);
        assert_eq!(RecordStatus::from_primitive(b"null"), RecordStatus::Active);
        assert_eq!(RecordStatus::from_primitive(b"-"), RecordStatus::Active);
        assert_eq!(
            RecordStatus::from_primitive(b"99999999999999999999"),
            RecordStatus::Active
        );
    }
}
