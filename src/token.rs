//! Structure block token definitions.
//!
//! The structure block is a stream of big-endian u32 tokens, each aligned
//! to a 4-byte boundary, encoding the node/property tree.

use crate::error::{ResourceTableError, Result};

/// Opens a node; followed by the node's NUL-terminated name, padded to 4 bytes.
pub const TOKEN_BEGIN_NODE: u32 = 0x1;

/// Closes the most recently opened node.
pub const TOKEN_END_NODE: u32 = 0x2;

/// Introduces a property record (length, name offset, value bytes).
pub const TOKEN_PROP: u32 = 0x3;

/// Padding; ignored wherever a token is expected.
pub const TOKEN_NOP: u32 = 0x4;

/// Terminates the structure block.
pub const TOKEN_END: u32 = 0x9;

/// Structure block tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureToken {
    /// Opens a node; the node's name follows the token.
    BeginNode,

    /// Closes the current node.
    EndNode,

    /// A property record attached to the current node.
    Prop,

    /// Padding; carries no content.
    Nop,

    /// End of the structure block.
    End,
}

impl StructureToken {
    /// Parses a token from its u32 encoding.
    ///
    /// The offset is carried into the error so corrupted blobs report where
    /// the bad token sits.
    pub fn from_u32(value: u32, offset: usize) -> Result<Self> {
        match value {
            TOKEN_BEGIN_NODE => Ok(StructureToken::BeginNode),
            TOKEN_END_NODE => Ok(StructureToken::EndNode),
            TOKEN_PROP => Ok(StructureToken::Prop),
            TOKEN_NOP => Ok(StructureToken::Nop),
            TOKEN_END => Ok(StructureToken::End),
            _ => Err(ResourceTableError::InvalidToken {
                token: value,
                offset,
            }),
        }
    }

    /// Returns the u32 encoding for this token.
    pub fn value(&self) -> u32 {
        match self {
            StructureToken::BeginNode => TOKEN_BEGIN_NODE,
            StructureToken::EndNode => TOKEN_END_NODE,
            StructureToken::Prop => TOKEN_PROP,
            StructureToken::Nop => TOKEN_NOP,
            StructureToken::End => TOKEN_END,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_u32() {
        assert_eq!(
            StructureToken::from_u32(0x1, 0).unwrap(),
            StructureToken::BeginNode
        );
        assert_eq!(
            StructureToken::from_u32(0x9, 0).unwrap(),
            StructureToken::End
        );
    }

    #[test]
    fn test_token_value_roundtrip() {
        for token in [
            StructureToken::BeginNode,
            StructureToken::EndNode,
            StructureToken::Prop,
            StructureToken::Nop,
            StructureToken::End,
        ] {
            assert_eq!(StructureToken::from_u32(token.value(), 0).unwrap(), token);
        }
    }

    #[test]
    fn test_invalid_token_carries_offset() {
        let err = StructureToken::from_u32(0x7, 0x40).unwrap_err();
        assert!(matches!(
            err,
            ResourceTableError::InvalidToken {
                token: 0x7,
                offset: 0x40
            }
        ));
    }
}
