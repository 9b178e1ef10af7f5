//! Memory reservation block parsing.
//!
//! The reservation block is a sequence of 16-byte entries, each a
//! big-endian `(address, size)` pair of u64 values, terminated by an
//! all-zero entry. It lists physical ranges the consumer must leave
//! untouched.

use crate::error::Result;
use crate::utils::read_u64_be;

/// Size of one reservation entry in bytes.
pub const RESERVATION_ENTRY_SIZE: usize = 16;

/// One reserved physical memory range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReservationEntry {
    /// Physical start address of the range.
    pub address: u64,

    /// Length of the range in bytes.
    pub size: u64,
}

impl ReservationEntry {
    /// Returns true for the all-zero entry that terminates the block.
    pub fn is_terminator(&self) -> bool {
        self.address == 0 && self.size == 0
    }
}

/// Walks the reservation block starting at `offset` and collects every
/// entry up to (not including) the terminator.
///
/// `data` must already be clipped to the blob's declared total size, so a
/// block that runs off the end surfaces as a truncated read.
///
/// # Errors
///
/// Returns `ResourceTableError::TruncatedData` if the terminator entry is
/// not reached before the end of `data`.
pub fn parse_reservations(data: &[u8], offset: usize) -> Result<Vec<ReservationEntry>> {
    let mut entries = Vec::new();
    let mut pos = offset;

    loop {
        let address = read_u64_be(data, pos)?;
        let size = read_u64_be(data, pos + 8)?;
        let entry = ReservationEntry { address, size };
        if entry.is_terminator() {
            return Ok(entries);
        }
        entries.push(entry);
        pos += RESERVATION_ENTRY_SIZE;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceTableError;

    fn entry_bytes(address: u64, size: u64) -> Vec<u8> {
        let mut data = Vec::with_capacity(RESERVATION_ENTRY_SIZE);
        data.extend_from_slice(&address.to_be_bytes());
        data.extend_from_slice(&size.to_be_bytes());
        data
    }

    #[test]
    fn test_empty_block() {
        let data = entry_bytes(0, 0);
        assert!(parse_reservations(&data, 0).unwrap().is_empty());
    }

    #[test]
    fn test_two_entries() {
        let mut data = entry_bytes(0x8000_0000, 0x1000);
        data.extend(entry_bytes(0x9000_0000, 0x2000));
        data.extend(entry_bytes(0, 0));

        let entries = parse_reservations(&data, 0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].address, 0x8000_0000);
        assert_eq!(entries[0].size, 0x1000);
        assert_eq!(entries[1].address, 0x9000_0000);
        assert!(!entries[1].is_terminator());
    }

    #[test]
    fn test_missing_terminator() {
        let data = entry_bytes(0x8000_0000, 0x1000);
        let err = parse_reservations(&data, 0).unwrap_err();
        assert!(matches!(err, ResourceTableError::TruncatedData { .. }));
    }

    #[test]
    fn test_offset_past_end() {
        let data = entry_bytes(0, 0);
        assert!(parse_reservations(&data, 32).is_err());
    }
}
