//! Error types for resource table parsing operations.
//!
//! This module provides comprehensive error handling for all resource table
//! operations, including I/O errors, format violations, and structural
//! corruption in the blob.

use std::io;
use thiserror::Error;

/// Result type alias for resource table operations.
pub type Result<T> = std::result::Result<T, ResourceTableError>;

/// Errors that can occur while parsing or querying a resource table.
#[derive(Error, Debug)]
pub enum ResourceTableError {
    /// I/O error occurred while reading the blob file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Blob is too small to contain a valid header.
    #[error("Blob too small: {size} bytes (minimum: {minimum} bytes)")]
    BlobTooSmall {
        size: usize,
        minimum: usize,
    },

    /// Invalid magic number in the blob header.
    #[error("Invalid magic: expected {expected:#010x}, found {found:#010x}")]
    InvalidMagic {
        expected: u32,
        found: u32,
    },

    /// Unsupported blob format version.
    #[error("Unsupported version: {version} (last compatible: {last_comp})")]
    UnsupportedVersion {
        version: u32,
        last_comp: u32,
    },

    /// Invalid blob format or corrupted data.
    #[error("Invalid blob format: {0}")]
    InvalidFormat(String),

    /// Data truncated or incomplete.
    #[error("Truncated data at offset {offset:#x}: expected {expected} bytes, got {actual} bytes")]
    TruncatedData {
        offset: usize,
        expected: usize,
        actual: usize,
    },

    /// Unknown or misplaced structure token.
    #[error("Invalid token {token:#x} at offset {offset:#x}")]
    InvalidToken {
        token: u32,
        offset: usize,
    },

    /// String data is unterminated or not valid UTF-8.
    #[error("Invalid string at offset {offset:#x}")]
    InvalidString {
        offset: usize,
    },

    /// A required node path is absent from the tree.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// Address cell count is not 1 or 2.
    #[error("Invalid cell width: {cells} cells (expected 1 or 2)")]
    InvalidCellWidth {
        cells: u32,
    },

    /// A required property is absent from its node.
    #[error("Property missing: {name}")]
    PropertyMissing {
        name: String,
    },

    /// A property's byte length does not match its declared cell width.
    #[error("Property '{name}' length mismatch: expected {expected} bytes, got {actual} bytes")]
    PropertyLengthMismatch {
        /// Name of the property whose value was mis-sized
        name: String,
        /// Byte length implied by the node's address cell width
        expected: usize,
        /// Byte length actually stored
        actual: usize,
    },

    /// A requested enumeration index is past the end.
    #[error("Index {index} out of range (count: {count})")]
    IndexOutOfRange {
        index: usize,
        count: usize,
    },
}

impl ResourceTableError {
    /// Creates an invalid magic error with context.
    ///
    /// # Arguments
    ///
    /// * `expected` - Expected magic value
    /// * `found` - Actual value found at the start of the blob
    pub fn invalid_magic(expected: u32, found: u32) -> Self {
        Self::InvalidMagic { expected, found }
    }

    /// Creates a truncated data error with context.
    ///
    /// # Arguments
    ///
    /// * `offset` - Offset at which the read was attempted
    /// * `expected` - Number of bytes required
    /// * `actual` - Number of bytes available
    pub fn truncated(offset: usize, expected: usize, actual: usize) -> Self {
        Self::TruncatedData {
            offset,
            expected,
            actual,
        }
    }

    /// Creates a format error with detailed context.
    ///
    /// # Arguments
    ///
    /// * `message` - Description of the format error
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use resource_table::error::ResourceTableError;
    /// let offset = 0x58;
    /// let err = ResourceTableError::format_error(
    ///     format!("Property after subnode at offset {:#x}", offset)
    /// );
    /// ```
    pub fn format_error(message: String) -> Self {
        Self::InvalidFormat(message)
    }

    /// Creates a path not found error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use resource_table::error::ResourceTableError;
    /// let err = ResourceTableError::path_not_found("/memorys");
    /// ```
    pub fn path_not_found(path: &str) -> Self {
        Self::PathNotFound(path.to_string())
    }

    /// Creates a property missing error.
    pub fn property_missing(name: &str) -> Self {
        Self::PropertyMissing {
            name: name.to_string(),
        }
    }

    /// Creates a property length mismatch error.
    pub fn length_mismatch(name: &str, expected: usize, actual: usize) -> Self {
        Self::PropertyLengthMismatch {
            name: name.to_string(),
            expected,
            actual,
        }
    }
}
