//! Address cell width handling for scalar properties.
//!
//! A node's `#address-cells` property declares how many 32-bit cells its
//! children use for each scalar value. Only 1 (32-bit) and 2 (64-bit) are
//! meaningful here; the width is resolved once per parent node and passed
//! into every decode.

use crate::error::{ResourceTableError, Result};
use crate::utils::{read_u32_be, read_u64_be};

/// Scalar width declared by a node's address cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellWidth {
    /// One cell: values are 32-bit, zero-extended to u64 on read.
    Width32,

    /// Two cells: values are 64-bit.
    Width64,
}

impl CellWidth {
    /// Cell count assumed when a node carries no `#address-cells` property.
    pub const DEFAULT_CELLS: u32 = 2;

    /// Maps a raw cell count to a width.
    ///
    /// # Errors
    ///
    /// Returns `ResourceTableError::InvalidCellWidth` for any count other
    /// than 1 or 2.
    pub fn from_cells(cells: u32) -> Result<Self> {
        match cells {
            1 => Ok(CellWidth::Width32),
            2 => Ok(CellWidth::Width64),
            _ => Err(ResourceTableError::InvalidCellWidth { cells }),
        }
    }

    /// Byte length a scalar of this width occupies.
    pub fn byte_len(&self) -> usize {
        match self {
            CellWidth::Width32 => 4,
            CellWidth::Width64 => 8,
        }
    }

    /// Decodes a big-endian scalar of this width from property value bytes.
    ///
    /// The value must be exactly `byte_len()` bytes; `name` identifies the
    /// property in the mismatch error.
    pub fn read_scalar(&self, name: &str, value: &[u8]) -> Result<u64> {
        if value.len() != self.byte_len() {
            return Err(ResourceTableError::length_mismatch(
                name,
                self.byte_len(),
                value.len(),
            ));
        }

        match self {
            CellWidth::Width32 => Ok(u64::from(read_u32_be(value, 0)?)),
            CellWidth::Width64 => read_u64_be(value, 0),
        }
    }
}
