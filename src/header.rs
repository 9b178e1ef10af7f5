//! Resource table blob header parsing.
//!
//! The header is the first 40 bytes of the blob. It contains the magic
//! number, the declared total size, the offsets and sizes of the memory
//! reservation, structure, and strings blocks, and the format version.
//! All fields are big-endian u32 values.

use crate::error::{ResourceTableError, Result};
use crate::utils::read_u32_be;
use std::fmt;
use std::ops::Range;

/// Size of the blob header in bytes (ten u32 fields).
pub const HEADER_SIZE: usize = 40;

/// Expected magic number at the start of a valid blob.
pub const BLOB_MAGIC: u32 = 0xd00d_feed;

/// Format version this parser understands.
pub const SUPPORTED_VERSION: u32 = 17;

/// Resource table blob header.
///
/// Parsed copy of the ten fixed header fields. Offsets are relative to the
/// start of the blob.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlobHeader {
    /// Magic number, must be `0xd00dfeed`.
    pub magic: u32,

    /// Declared size of the entire blob in bytes.
    pub totalsize: u32,

    /// Offset of the structure block.
    pub off_dt_struct: u32,

    /// Offset of the strings block.
    pub off_dt_strings: u32,

    /// Offset of the memory reservation block.
    pub off_mem_rsvmap: u32,

    /// Format version.
    pub version: u32,

    /// Oldest version this blob is backwards compatible with.
    pub last_comp_version: u32,

    /// Physical id of the booting CPU.
    pub boot_cpuid_phys: u32,

    /// Size of the strings block in bytes.
    pub size_dt_strings: u32,

    /// Size of the structure block in bytes.
    pub size_dt_struct: u32,
}

impl BlobHeader {
    /// Parses a blob header from raw bytes.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw bytes of the blob (must be at least 40 bytes).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is too small
    /// - Magic number is wrong
    /// - Version is outside the supported window
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(ResourceTableError::BlobTooSmall {
                size: data.len(),
                minimum: HEADER_SIZE,
            });
        }

        let magic = read_u32_be(data, 0)?;
        if magic != BLOB_MAGIC {
            return Err(ResourceTableError::invalid_magic(BLOB_MAGIC, magic));
        }

        let totalsize = read_u32_be(data, 4)?;
        let off_dt_struct = read_u32_be(data, 8)?;
        let off_dt_strings = read_u32_be(data, 12)?;
        let off_mem_rsvmap = read_u32_be(data, 16)?;
        let version = read_u32_be(data, 20)?;
        let last_comp_version = read_u32_be(data, 24)?;
        let boot_cpuid_phys = read_u32_be(data, 28)?;
        let size_dt_strings = read_u32_be(data, 32)?;
        let size_dt_struct = read_u32_be(data, 36)?;

        // Accept version 17 and later blobs that remain compatible with 17.
        if version < SUPPORTED_VERSION || last_comp_version > SUPPORTED_VERSION {
            return Err(ResourceTableError::UnsupportedVersion {
                version,
                last_comp: last_comp_version,
            });
        }

        Ok(BlobHeader {
            magic,
            totalsize,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            version,
            last_comp_version,
            boot_cpuid_phys,
            size_dt_strings,
            size_dt_struct,
        })
    }

    /// Checks the declared offsets and sizes against the real buffer length.
    ///
    /// # Errors
    ///
    /// Returns an error if the declared total size exceeds the buffer, any
    /// block offset falls inside the header or past the total size, the
    /// structure block is not 4-byte aligned, or the reservation block is
    /// not 8-byte aligned.
    pub fn validate_bounds(&self, buffer_len: usize) -> Result<()> {
        let totalsize = self.totalsize as usize;

        if totalsize < HEADER_SIZE {
            return Err(ResourceTableError::format_error(format!(
                "Declared total size {} smaller than header",
                totalsize
            )));
        }
        if totalsize > buffer_len {
            return Err(ResourceTableError::TruncatedData {
                offset: 0,
                expected: totalsize,
                actual: buffer_len,
            });
        }

        if self.off_mem_rsvmap % 8 != 0 {
            return Err(ResourceTableError::format_error(format!(
                "Reservation block offset {:#x} not 8-byte aligned",
                self.off_mem_rsvmap
            )));
        }
        if self.off_dt_struct % 4 != 0 {
            return Err(ResourceTableError::format_error(format!(
                "Structure block offset {:#x} not 4-byte aligned",
                self.off_dt_struct
            )));
        }

        // An offset equal to totalsize is allowed: it is where an empty
        // block at the tail of the blob sits.
        for (name, offset) in [
            ("reservation", self.off_mem_rsvmap),
            ("structure", self.off_dt_struct),
            ("strings", self.off_dt_strings),
        ] {
            if (offset as usize) < HEADER_SIZE || offset as usize > totalsize {
                return Err(ResourceTableError::format_error(format!(
                    "{} block offset {:#x} outside blob bounds",
                    name, offset
                )));
            }
        }

        // u64 arithmetic so offset + size cannot wrap.
        let struct_end = u64::from(self.off_dt_struct) + u64::from(self.size_dt_struct);
        let strings_end = u64::from(self.off_dt_strings) + u64::from(self.size_dt_strings);
        if struct_end > u64::from(self.totalsize) {
            return Err(ResourceTableError::format_error(format!(
                "Structure block ({:#x} + {}) past declared size {}",
                self.off_dt_struct, self.size_dt_struct, self.totalsize
            )));
        }
        if strings_end > u64::from(self.totalsize) {
            return Err(ResourceTableError::format_error(format!(
                "Strings block ({:#x} + {}) past declared size {}",
                self.off_dt_strings, self.size_dt_strings, self.totalsize
            )));
        }

        Ok(())
    }

    /// Byte range of the structure block within the blob.
    pub fn struct_range(&self) -> Range<usize> {
        let start = self.off_dt_struct as usize;
        start..start + self.size_dt_struct as usize
    }

    /// Byte range of the strings block within the blob.
    pub fn strings_range(&self) -> Range<usize> {
        let start = self.off_dt_strings as usize;
        start..start + self.size_dt_strings as usize
    }
}

impl fmt::Display for BlobHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Resource Table Header:\n\
             - Version: {} (last compatible: {})\n\
             - Total Size: {} bytes\n\
             - Structure Block: offset {:#x}, {} bytes\n\
             - Strings Block: offset {:#x}, {} bytes\n\
             - Reservation Block: offset {:#x}\n\
             - Boot CPU: {}",
            self.version,
            self.last_comp_version,
            self.totalsize,
            self.off_dt_struct,
            self.size_dt_struct,
            self.off_dt_strings,
            self.size_dt_strings,
            self.off_mem_rsvmap,
            self.boot_cpuid_phys
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header(fields: [u32; 10]) -> Vec<u8> {
        let mut data = Vec::with_capacity(HEADER_SIZE);
        for field in fields {
            data.extend_from_slice(&field.to_be_bytes());
        }
        data
    }

    fn valid_fields() -> [u32; 10] {
        // magic, totalsize, off_dt_struct, off_dt_strings, off_mem_rsvmap,
        // version, last_comp_version, boot_cpuid_phys, size_dt_strings,
        // size_dt_struct
        [BLOB_MAGIC, 96, 56, 76, 40, 17, 17, 0, 20, 20]
    }

    #[test]
    fn test_header_size() {
        assert_eq!(HEADER_SIZE, 40);
    }

    #[test]
    fn test_parse_valid() {
        let data = raw_header(valid_fields());
        let header = BlobHeader::parse(&data).unwrap();
        assert_eq!(header.magic, BLOB_MAGIC);
        assert_eq!(header.totalsize, 96);
        assert_eq!(header.off_dt_struct, 56);
        assert_eq!(header.version, 17);
    }

    #[test]
    fn test_too_small() {
        let data = vec![0u8; 10];
        let result = BlobHeader::parse(&data);
        assert!(matches!(
            result.unwrap_err(),
            ResourceTableError::BlobTooSmall { .. }
        ));
    }

    #[test]
    fn test_invalid_magic() {
        let mut fields = valid_fields();
        fields[0] = 0xdead_beef;
        let result = BlobHeader::parse(&raw_header(fields));
        assert!(matches!(
            result.unwrap_err(),
            ResourceTableError::InvalidMagic { .. }
        ));
    }

    #[test]
    fn test_version_too_old() {
        let mut fields = valid_fields();
        fields[5] = 16;
        fields[6] = 16;
        let result = BlobHeader::parse(&raw_header(fields));
        assert!(matches!(
            result.unwrap_err(),
            ResourceTableError::UnsupportedVersion {
                version: 16,
                last_comp: 16
            }
        ));
    }

    #[test]
    fn test_last_comp_too_new() {
        let mut fields = valid_fields();
        fields[5] = 18;
        fields[6] = 18;
        let result = BlobHeader::parse(&raw_header(fields));
        assert!(matches!(
            result.unwrap_err(),
            ResourceTableError::UnsupportedVersion { .. }
        ));
    }

    #[test]
    fn test_newer_but_compatible_version() {
        let mut fields = valid_fields();
        fields[5] = 18;
        fields[6] = 17;
        assert!(BlobHeader::parse(&raw_header(fields)).is_ok());
    }

    #[test]
    fn test_bounds_totalsize_past_buffer() {
        let header = BlobHeader::parse(&raw_header(valid_fields())).unwrap();
        let result = header.validate_bounds(50);
        assert!(matches!(
            result.unwrap_err(),
            ResourceTableError::TruncatedData { .. }
        ));
    }

    #[test]
    fn test_bounds_misaligned_struct() {
        let mut fields = valid_fields();
        fields[2] = 58;
        let header = BlobHeader::parse(&raw_header(fields)).unwrap();
        assert!(header.validate_bounds(96).is_err());
    }

    #[test]
    fn test_bounds_offset_inside_header() {
        let mut fields = valid_fields();
        fields[4] = 8;
        let header = BlobHeader::parse(&raw_header(fields)).unwrap();
        assert!(header.validate_bounds(96).is_err());
    }

    #[test]
    fn test_bounds_empty_block_at_tail() {
        let mut fields = valid_fields();
        // A blob with no properties has a zero-size strings block sitting
        // at the end of the blob.
        fields[3] = 96;
        fields[8] = 0;
        let header = BlobHeader::parse(&raw_header(fields)).unwrap();
        assert!(header.validate_bounds(96).is_ok());
    }

    #[test]
    fn test_display() {
        let header = BlobHeader::parse(&raw_header(valid_fields())).unwrap();
        let text = format!("{}", header);
        assert!(text.contains("Version: 17"));
        assert!(text.contains("Total Size: 96 bytes"));
    }
}
