//! Utility functions for binary parsing and string handling.

use crate::error::{ResourceTableError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

/// Reads a big-endian u32 from a byte slice at the given offset.
pub fn read_u32_be(data: &[u8], offset: usize) -> Result<u32> {
    if offset + 4 > data.len() {
        return Err(ResourceTableError::TruncatedData {
            offset,
            expected: 4,
            actual: data.len().saturating_sub(offset),
        });
    }

    let mut cursor = Cursor::new(&data[offset..offset + 4]);
    Ok(cursor.read_u32::<BigEndian>()?)
}

/// Reads a big-endian u64 from a byte slice at the given offset.
pub fn read_u64_be(data: &[u8], offset: usize) -> Result<u64> {
    if offset + 8 > data.len() {
        return Err(ResourceTableError::TruncatedData {
            offset,
            expected: 8,
            actual: data.len().saturating_sub(offset),
        });
    }

    let mut cursor = Cursor::new(&data[offset..offset + 8]);
    Ok(cursor.read_u64::<BigEndian>()?)
}

/// Reads a NUL-terminated UTF-8 string starting at the given offset.
///
/// The returned slice borrows from `data` and excludes the terminator.
///
/// # Errors
///
/// Returns `ResourceTableError::InvalidString` if no NUL terminator is
/// found before the end of the buffer or the bytes are not valid UTF-8.
pub fn read_cstr(data: &[u8], offset: usize) -> Result<&str> {
    if offset >= data.len() {
        return Err(ResourceTableError::InvalidString { offset });
    }

    let tail = &data[offset..];
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(ResourceTableError::InvalidString { offset })?;

    std::str::from_utf8(&tail[..end])
        .map_err(|_| ResourceTableError::InvalidString { offset })
}

/// Rounds an offset up to the next 4-byte boundary.
#[inline]
pub fn align4(offset: usize) -> usize {
    (offset + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32_be() {
        let data = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(read_u32_be(&data, 0).unwrap(), 0x01020304);
    }

    #[test]
    fn test_read_u32_be_truncated() {
        let data = [0x01, 0x02];
        let err = read_u32_be(&data, 0).unwrap_err();
        assert!(matches!(
            err,
            ResourceTableError::TruncatedData {
                offset: 0,
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_read_u64_be() {
        let data = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x30, 0x00];
        assert_eq!(read_u64_be(&data, 0).unwrap(), 0x3000);
    }

    #[test]
    fn test_read_u64_be_offset_past_end() {
        let data = [0u8; 8];
        assert!(read_u64_be(&data, 4).is_err());
    }

    #[test]
    fn test_read_cstr() {
        let data = b"uart0\0timer0\0";
        assert_eq!(read_cstr(data, 0).unwrap(), "uart0");
        assert_eq!(read_cstr(data, 6).unwrap(), "timer0");
    }

    #[test]
    fn test_read_cstr_empty() {
        let data = b"\0rest";
        assert_eq!(read_cstr(data, 0).unwrap(), "");
    }

    #[test]
    fn test_read_cstr_unterminated() {
        let data = b"uart0";
        assert!(read_cstr(data, 0).is_err());
    }

    #[test]
    fn test_read_cstr_invalid_utf8() {
        let data = [0xff, 0xfe, 0x00];
        assert!(read_cstr(&data, 0).is_err());
    }

    #[test]
    fn test_align4() {
        assert_eq!(align4(0), 0);
        assert_eq!(align4(1), 4);
        assert_eq!(align4(4), 4);
        assert_eq!(align4(5), 8);
        assert_eq!(align4(7), 8);
    }
}
