//! # Resource Table Parser
//!
//! A zero-copy parser and query engine for partition resource table blobs.
//!
//! A resource table is a flattened, self-describing binary tree (in the
//! flattened device tree format) that tells a hardware partition's
//! firmware what it owns: the partition's identity, its memory regions,
//! and its device list. This crate validates such a blob, walks its
//! node/property layout, and answers typed queries over it.
//!
//! ## Features
//!
//! - **Fast loading**: Memory-mapped I/O for efficient, zero-copy access
//! - **Strict validation**: The whole blob is checked before any query runs
//! - **Type-safe**: Scalars decode per the declared address cell width
//! - **Borrowed views**: Strings and byte values borrow the table's buffer
//! - **Comprehensive error handling**: Detailed error types for debugging
//!
//! ## Architecture
//!
//! The parser is built on several layers:
//!
//! 1. **Header**: Fixed 40-byte block with the magic, version, and block offsets
//! 2. **Reservation Block**: Physical ranges the consumer must leave untouched
//! 3. **Structure Block**: Token stream encoding the node/property tree
//! 4. **Strings Block**: Pool of NUL-terminated property names
//! 5. **Query Engine**: Identity, memory region, and device lookups
//!
//! ## Binary Layout
//!
//! Resource table blobs follow this structure (all fields big-endian):
//!
//! ```text
//! [Header - 40 bytes]
//!   - Magic: 0xd00dfeed
//!   - Total size, block offsets and sizes
//!   - Version window
//!
//! [Memory Reservation Block - 8-byte aligned]
//!   [(address: u64, size: u64) entries]
//!   [All-zero terminator entry]
//!
//! [Structure Block - 4-byte aligned]
//!   [BEGIN_NODE token][name, NUL-terminated, padded]
//!     [PROP token][len][nameoff][value bytes, padded]
//!     ... subnodes ...
//!   [END_NODE token]
//!   [END token]
//!
//! [Strings Block]
//!   [NUL-terminated property names]
//! ```
//!
//! ## Examples
//!
//! ### Basic Usage
//!
//! ```no_run
//! use resource_table::ResourceTable;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open and validate a blob
//! let table = ResourceTable::open("partition.dtb")?;
//!
//! // Partition identity
//! println!("cell: {}", table.cell_name().unwrap_or("<unnamed>"));
//! println!("cpu:  {}", table.cpu_name().unwrap_or("<unnamed>"));
//!
//! // Enumerate memory regions
//! for i in 0..table.memory_count()? {
//!     let region = table.memory_at(i)?;
//!     println!("memory {}: {:#x} {:#x} {:#x}", i, region.phys, region.virt, region.size);
//! }
//!
//! // Enumerate devices
//! for i in 0..table.device_count()? {
//!     println!("device {}: {}", i, table.device_name(i).unwrap_or("<unnamed>"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Diagnostic Dump
//!
//! ```no_run
//! use resource_table::ResourceTable;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let table = ResourceTable::open("partition.dtb")?;
//! print!("{}", table.dump());
//! # Ok(())
//! # }
//! ```
//!
//! ## Supported Features
//!
//! - Full blob validation (header, reservation block, structure walk)
//! - Path lookup with `name@unit` matching
//! - 32-bit and 64-bit scalar properties per `#address-cells`
//! - Memory reservation block enumeration
//! - Diagnostic full-tree dump
//!
//! Writing or mutating blobs is out of scope; the blob is read-only once
//! loaded.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cells;
pub mod error;
pub mod header;
pub mod rsvmap;
pub mod structure;
pub mod table;
pub mod token;
pub mod utils;

// Re-export main types for convenience
pub use cells::CellWidth;
pub use error::{ResourceTableError, Result};
pub use header::{BlobHeader, BLOB_MAGIC, HEADER_SIZE, SUPPORTED_VERSION};
pub use rsvmap::ReservationEntry;
pub use structure::{ChildIter, Property, PropertyIter, StructureBlock};
pub use table::{MemoryRegion, ResourceTable, TableDump};
pub use token::StructureToken;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
