//! Bounds-checked edits of the store file.
//!
//! Every mutation of the store goes through one of these helpers. None of
//! them writes outside the current file: a bad offset is reported as
//! corruption before anything is touched.

use crate::error::{CoreError, CoreResult};
use crate::record::{RecordStatus, ARRAY_CLOSE, EMPTY_STORE, STATUS_TOMBSTONED};
use ddb_codec::Span;
use ddb_storage::StorageBackend;

const BACKWARD_WINDOW: u64 = 64;

/// Overwrites the byte at `offset` with `new`, after checking it holds
/// `expected`.
///
/// # Errors
///
/// Returns [`CoreError::StorageCorruption`] if `offset` is outside the file
/// or the byte differs from `expected`.
pub fn patch_byte(
    backend: &mut dyn StorageBackend,
    offset: u64,
    expected: u8,
    new: u8,
) -> CoreResult<()> {
    let size = backend.size()?;
    if offset >= size {
        return Err(CoreError::storage_corruption(
            offset,
            format!("patch offset is outside the file of {size} bytes"),
        ));
    }
    let current = backend.read_at(offset, 1)?;
    if current.first() != Some(&expected) {
        return Err(CoreError::storage_corruption(
            offset,
            format!(
                "expected byte {:?}, found {:?}",
                char::from(expected),
                current.first().map(|&b| char::from(b))
            ),
        ));
    }
    backend.write_at(offset, &[new])?;
    Ok(())
}

/// Overwrites an active status primitive with `0` padded by spaces to its
/// old length.
///
/// # Errors
///
/// Returns [`CoreError::StorageCorruption`] if `span` is outside the file or
/// the bytes there are not an active status primitive.
pub fn tombstone_status(backend: &mut dyn StorageBackend, span: Span) -> CoreResult<()> {
    let size = backend.size()?;
    if span.is_empty() || span.end > size {
        return Err(CoreError::storage_corruption(
            span.start,
            format!("status span is outside the file of {size} bytes"),
        ));
    }
    let current = backend.read_at(span.start, span.len() as usize)?;
    let is_primitive = current
        .iter()
        .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'-' | b'.'));
    if !is_primitive || !RecordStatus::from_primitive(&current).is_active() {
        return Err(CoreError::storage_corruption(
            span.start,
            format!("expected an active status, found {:?}", String::from_utf8_lossy(&current)),
        ));
    }
    let mut tombstone = vec![b' '; current.len()];
    tombstone[0] = STATUS_TOMBSTONED;
    backend.write_at(span.start, &tombstone)?;
    Ok(())
}

/// Overwrites `bytes.len()` bytes starting at `offset`.
///
/// # Errors
///
/// Returns [`CoreError::StorageCorruption`] if the range does not lie
/// within the file.
pub fn splice(backend: &mut dyn StorageBackend, offset: u64, bytes: &[u8]) -> CoreResult<()> {
    let size = backend.size()?;
    let end = offset.saturating_add(bytes.len() as u64);
    if end > size {
        return Err(CoreError::storage_corruption(
            offset,
            format!("splice of {} bytes runs past the file end at {size}", bytes.len()),
        ));
    }
    backend.write_at(offset, bytes)?;
    Ok(())
}

/// Cuts the record array at `pos` and closes it again.
///
/// Searches backward from `pos` for the nearest `,` or `[`, allowing only
/// whitespace in between. The file is truncated at the comma, or just after
/// the bracket, and `\n]` is appended. Returns the new file size.
///
/// # Errors
///
/// Returns [`CoreError::StorageCorruption`] if `pos` is past the end of the
/// file or anything other than whitespace precedes it.
pub fn truncate_array_at(backend: &mut dyn StorageBackend, pos: u64) -> CoreResult<u64> {
    let size = backend.size()?;
    if pos > size {
        return Err(CoreError::storage_corruption(
            pos,
            format!("truncate position is past the file end at {size}"),
        ));
    }

    match last_significant_byte(backend, pos)? {
        Some((at, b',')) => close_array_at(backend, at),
        Some((at, b'[')) => close_array_at(backend, at + 1),
        Some((at, other)) => Err(CoreError::storage_corruption(
            at,
            format!(
                "expected ',' or '[' before offset {pos}, found {:?}",
                char::from(other)
            ),
        )),
        None => Err(CoreError::storage_corruption(
            pos,
            "no ',' or '[' before truncate position",
        )),
    }
}

/// Returns the last non-whitespace byte before `pos` and its offset.
///
/// # Errors
///
/// Returns a storage error if `pos` is past the end of the file.
pub fn last_significant_byte(
    backend: &dyn StorageBackend,
    pos: u64,
) -> CoreResult<Option<(u64, u8)>> {
    let mut window_end = pos;
    while window_end > 0 {
        let window_start = window_end.saturating_sub(BACKWARD_WINDOW);
        let bytes = backend.read_at(window_start, (window_end - window_start) as usize)?;
        if let Some(i) = bytes
            .iter()
            .rposition(|byte| !matches!(byte, b' ' | b'\t' | b'\n' | b'\r'))
        {
            return Ok(Some((window_start + i as u64, bytes[i])));
        }
        window_end = window_start;
    }
    Ok(None)
}

/// Truncates the file to `pos` and appends `\n]`. Returns the new size.
///
/// # Errors
///
/// Returns an error if `pos` is past the end of the file or a write fails.
pub fn close_array_at(backend: &mut dyn StorageBackend, pos: u64) -> CoreResult<u64> {
    backend.truncate(pos)?;
    backend.append(ARRAY_CLOSE)?;
    Ok(pos + ARRAY_CLOSE.len() as u64)
}

/// Replaces the whole file with an empty store.
///
/// # Errors
///
/// Returns an error if a write fails.
pub fn reset_store(backend: &mut dyn StorageBackend) -> CoreResult<()> {
    backend.truncate(0)?;
    backend.append(EMPTY_STORE)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddb_storage::InMemoryBackend;

    #[test]
    fn patch_byte_checks_expected_value() {
        let mut backend = InMemoryBackend::with_data(br#"[{"s":1}]"#.to_vec());
        patch_byte(&mut backend, 6, b'1', b'0').unwrap();
        assert_eq!(backend.data(), br#"[{"s":0}]"#);

        let err = patch_byte(&mut backend, 6, b'1', b'0').unwrap_err();
        assert!(matches!(err, CoreError::StorageCorruption { offset: 6, .. }));
        assert_eq!(backend.data(), br#"[{"s":0}]"#);
    }

    #[test]
    fn patch_byte_outside_file() {
        let mut backend = InMemoryBackend::with_data(b"[\n]".to_vec());
        let err = patch_byte(&mut backend, 3, b']', b'x').unwrap_err();
        assert!(matches!(err, CoreError::StorageCorruption { offset: 3, .. }));
        assert_eq!(backend.data(), b"[\n]");
    }

    #[test]
    fn tombstone_status_pads_wide_values() {
        let mut backend = InMemoryBackend::with_data(br#"[{"s":true,"d":{}}]"#.to_vec());
        tombstone_status(&mut backend, Span::new(6, 10)).unwrap();
        assert_eq!(backend.data(), br#"[{"s":0   ,"d":{}}]"#);

        let err = tombstone_status(&mut backend, Span::new(6, 10)).unwrap_err();
        assert!(matches!(err, CoreError::StorageCorruption { offset: 6, .. }));
    }

    #[test]
    fn tombstone_status_rejects_structure() {
        let mut backend = InMemoryBackend::with_data(br#"[{"s":1,"d":{}}]"#.to_vec());
        for span in [Span::new(0, 1), Span::new(5, 8), Span::new(15, 20)] {
            assert!(matches!(
                tombstone_status(&mut backend, span),
                Err(CoreError::StorageCorruption { .. })
            ));
        }
        assert_eq!(backend.data(), br#"[{"s":1,"d":{}}]"#);
    }

    #[test]
    fn splice_within_file() {
        let mut backend = InMemoryBackend::with_data(b"[\n{\"a\":1},\n{\"b\":2}\n]".to_vec());
        splice(&mut backend, 2, b"{\"b\":2}").unwrap();
        assert_eq!(backend.data(), b"[\n{\"b\":2},\n{\"b\":2}\n]");
    }

    #[test]
    fn splice_cannot_extend_file() {
        let mut backend = InMemoryBackend::with_data(b"[\n]".to_vec());
        assert!(matches!(
            splice(&mut backend, 2, b"]]"),
            Err(CoreError::StorageCorruption { .. })
        ));
        assert_eq!(backend.data(), b"[\n]");
    }

    #[test]
    fn truncate_at_comma() {
        let mut backend = InMemoryBackend::with_data(b"[\n{},\n{},\n{}\n]".to_vec());
        let size = truncate_array_at(&mut backend, 10).unwrap();
        assert_eq!(backend.data(), b"[\n{},\n{}\n]");
        assert_eq!(size, 10);
    }

    #[test]
    fn truncate_after_bracket() {
        let mut backend = InMemoryBackend::with_data(b"[\n{}\n]".to_vec());
        truncate_array_at(&mut backend, 2).unwrap();
        assert_eq!(backend.data(), b"[\n]");
    }

    #[test]
    fn truncate_searches_across_windows() {
        let mut data = b"[{},".to_vec();
        data.extend(std::iter::repeat(b' ').take(200));
        let pos = data.len() as u64;
        data.extend_from_slice(b"{}\n]");
        let mut backend = InMemoryBackend::with_data(data);
        truncate_array_at(&mut backend, pos).unwrap();
        assert_eq!(backend.data(), b"[{}\n]");
    }

    #[test]
    fn truncate_rejects_non_whitespace_gap() {
        let mut backend = InMemoryBackend::with_data(b"[\n{} {}\n]".to_vec());
        let err = truncate_array_at(&mut backend, 5).unwrap_err();
        assert!(matches!(err, CoreError::StorageCorruption { offset: 3, .. }));
        assert_eq!(backend.data(), b"[\n{} {}\n]");

        let mut backend = InMemoryBackend::with_data(b"  {}".to_vec());
        assert!(truncate_array_at(&mut backend, 2).is_err());
        assert!(truncate_array_at(&mut backend, 9).is_err());
    }

    #[test]
    fn last_significant_byte_skips_whitespace() {
        let backend = InMemoryBackend::with_data(b"[ \n\t]".to_vec());
        assert_eq!(last_significant_byte(&backend, 4).unwrap(), Some((0, b'[')));
        assert_eq!(last_significant_byte(&backend, 0).unwrap(), None);
        assert_eq!(last_significant_byte(&backend, 5).unwrap(), Some((4, b']')));
    }

    #[test]
    fn reset_writes_empty_store() {
        let mut backend = InMemoryBackend::with_data(b"[\n{},\n{}\n]".to_vec());
        reset_store(&mut backend).unwrap();
        assert_eq!(backend.data(), b"[\n]");
    }
}
