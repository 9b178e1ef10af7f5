//! Resource table handle with memory-mapped file support.

use crate::cells::CellWidth;
use crate::error::{ResourceTableError, Result};
use crate::header::{BlobHeader, HEADER_SIZE};
use crate::rsvmap::{parse_reservations, ReservationEntry};
use crate::structure::{StructureBlock, WalkEvent};
use crate::utils::read_cstr;
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Root property naming the partition cell.
pub const CELL_NAME_PROP: &str = "cell_name";

/// Root property naming the partition's CPU.
pub const CPU_NAME_PROP: &str = "cpu_name";

/// Path of the node listing the partition's memory regions.
pub const MEMORYS_PATH: &str = "/memorys";

/// Path of the node listing the partition's devices.
pub const DEVICES_PATH: &str = "/devices";

const PHYS_PROP: &str = "phys";
const VIRT_PROP: &str = "virt";
const SIZE_PROP: &str = "size";

/// One memory region of the partition.
///
/// Derived on demand from a `/memorys` child node; all three fields decode
/// per the parent node's address cell width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MemoryRegion {
    /// Physical base address.
    pub phys: u64,

    /// Virtual base address.
    pub virt: u64,

    /// Region length in bytes.
    pub size: u64,
}

/// Resource table blob storage.
enum TableData {
    /// Memory-mapped file data.
    Mapped(Mmap),
    /// Owned data.
    Owned(Vec<u8>),
}

impl TableData {
    fn as_slice(&self) -> &[u8] {
        match self {
            TableData::Mapped(mmap) => mmap,
            TableData::Owned(data) => data,
        }
    }
}

/// A validated, queryable resource table.
///
/// Construction runs the full structural validation: header, memory
/// reservation block, and a complete walk of the structure block. Every
/// query on an existing handle therefore operates on bytes that were
/// well-formed at load time. Queries take `&self` and the handle holds no
/// interior mutability, so sharing a table across threads needs no
/// synchronization.
pub struct ResourceTable {
    /// Blob data - either memory-mapped or owned.
    data: TableData,

    /// Parsed blob header.
    header: BlobHeader,
}

impl ResourceTable {
    /// Opens a resource table blob file.
    ///
    /// The file is memory-mapped and validated in place.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the blob file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be opened
    /// - File is not a valid resource table blob
    /// - Header or structure is corrupted
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use resource_table::ResourceTable;
    ///
    /// let table = ResourceTable::open("partition.dtb").unwrap();
    /// ```
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening resource table blob");
        let file = File::open(&path)?;

        // Validate file size BEFORE creating memory map
        let metadata = file.metadata()?;
        let file_size = metadata.len() as usize;
        if file_size < HEADER_SIZE {
            return Err(ResourceTableError::BlobTooSmall {
                size: file_size,
                minimum: HEADER_SIZE,
            });
        }
        debug!(size = file_size, "File size validated");

        // SAFETY: This is safe because:
        // 1. The file is opened in read-only mode (no write access)
        // 2. The file size has been validated to be at least HEADER_SIZE
        // 3. The mmap lifetime is tied to the ResourceTable lifetime
        // 4. All access to the mmap is bounds-checked before slicing
        let mmap = unsafe { Mmap::map(&file)? };
        debug!(size = mmap.len(), "Memory mapped blob file");

        Self::new(TableData::Mapped(mmap))
    }

    /// Creates a table from a memory-mapped region.
    ///
    /// # Arguments
    ///
    /// * `mmap` - Memory-mapped blob data.
    pub fn from_mmap(mmap: Mmap) -> Result<Self> {
        Self::new(TableData::Mapped(mmap))
    }

    /// Creates a table from owned blob data.
    ///
    /// # Arguments
    ///
    /// * `data` - Owned blob data.
    pub fn from_vec(data: Vec<u8>) -> Result<Self> {
        Self::new(TableData::Owned(data))
    }

    /// Creates a table from borrowed blob data, copying it.
    ///
    /// # Arguments
    ///
    /// * `data` - Blob data to copy.
    pub fn from_data(data: &[u8]) -> Result<Self> {
        Self::new(TableData::Owned(data.to_vec()))
    }

    /// Validates storage and builds the handle.
    fn new(data: TableData) -> Result<Self> {
        let header = BlobHeader::parse(data.as_slice())?;
        header.validate_bounds(data.as_slice().len())?;

        let table = Self { data, header };
        parse_reservations(table.blob(), table.header.off_mem_rsvmap as usize)?;
        table.structure().validate()?;
        debug!(
            totalsize = table.header.totalsize,
            version = table.header.version,
            "Resource table validated"
        );

        Ok(table)
    }

    /// Returns a reference to the parsed blob header.
    pub fn header(&self) -> &BlobHeader {
        &self.header
    }

    /// Validated blob bytes, clipped to the declared total size.
    pub fn as_bytes(&self) -> &[u8] {
        self.blob()
    }

    /// Reserved physical ranges listed by the blob's reservation block.
    ///
    /// # Errors
    ///
    /// Returns an error if the block's terminator has been clobbered since
    /// the table was opened.
    pub fn reservations(&self) -> Result<Vec<ReservationEntry>> {
        parse_reservations(self.blob(), self.header.off_mem_rsvmap as usize)
    }

    /// Name of the partition cell, from the root `cell_name` property.
    ///
    /// The header is re-parsed before the lookup; a mapped file whose
    /// backing bytes no longer form a valid blob reports `None` instead of
    /// garbage. The returned view borrows the table's buffer.
    pub fn cell_name(&self) -> Option<&str> {
        self.root_string(CELL_NAME_PROP)
    }

    /// Name of the partition's CPU, from the root `cpu_name` property.
    ///
    /// Same recheck and borrowing rules as [`cell_name`](Self::cell_name).
    pub fn cpu_name(&self) -> Option<&str> {
        self.root_string(CPU_NAME_PROP)
    }

    /// Number of memory regions under `/memorys`.
    ///
    /// Every child is validated eagerly: each must carry `phys`, `virt`,
    /// and `size` values sized per the node's address cell width. One
    /// malformed child fails the whole call; no partial count is reported.
    ///
    /// # Errors
    ///
    /// Fails if `/memorys` is absent, its address cell count is not 1 or
    /// 2, or any child is missing a required property or carries one of
    /// the wrong size.
    pub fn memory_count(&self) -> Result<usize> {
        let structure = self.structure();
        let memorys = structure.find_path(MEMORYS_PATH)?;
        let width = CellWidth::from_cells(structure.address_cells(memorys)?)?;

        let mut count = 0;
        for child in structure.children(memorys)? {
            Self::read_region(structure, child?, width)?;
            count += 1;
        }
        Ok(count)
    }

    /// Memory region at the given 0-based position in storage order.
    ///
    /// The `/memorys` children are re-walked on every call; indices are
    /// positions in blob storage order.
    ///
    /// # Errors
    ///
    /// Fails if `/memorys` is absent, the index is past the last child,
    /// or the region's properties fail to decode.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use resource_table::ResourceTable;
    ///
    /// let table = ResourceTable::open("partition.dtb").unwrap();
    /// for i in 0..table.memory_count().unwrap() {
    ///     let region = table.memory_at(i).unwrap();
    ///     println!("{:#x} -> {:#x} ({} bytes)", region.phys, region.virt, region.size);
    /// }
    /// ```
    pub fn memory_at(&self, index: usize) -> Result<MemoryRegion> {
        let structure = self.structure();
        let memorys = structure.find_path(MEMORYS_PATH)?;
        let width = CellWidth::from_cells(structure.address_cells(memorys)?)?;

        let mut seen = 0;
        for child in structure.children(memorys)? {
            let child = child?;
            if seen == index {
                return Self::read_region(structure, child, width);
            }
            seen += 1;
        }
        Err(ResourceTableError::IndexOutOfRange { index, count: seen })
    }

    /// Number of direct child nodes under `/devices`.
    ///
    /// Unlike memory regions, device nodes carry no required properties at
    /// this layer; only their presence is counted.
    ///
    /// # Errors
    ///
    /// Fails if `/devices` is absent or the node body is corrupt.
    pub fn device_count(&self) -> Result<usize> {
        let structure = self.structure();
        let devices = structure.find_path(DEVICES_PATH)?;

        let mut count = 0;
        for child in structure.children(devices)? {
            child?;
            count += 1;
        }
        Ok(count)
    }

    /// Display name of the device at the given 0-based position.
    ///
    /// Returns `None` if `/devices` is absent or the index is out of
    /// range. The returned view borrows the table's buffer.
    pub fn device_name(&self, index: usize) -> Option<&str> {
        let structure = self.structure();
        let devices = structure.find_path(DEVICES_PATH).ok()?;

        let mut seen = 0;
        for child in structure.children(devices).ok()? {
            let child = child.ok()?;
            if seen == index {
                return structure.node_name(child).ok();
            }
            seen += 1;
        }
        None
    }

    /// Diagnostic rendering of the whole tree.
    ///
    /// Lists every node name and property name in blob traversal order
    /// (depth-first, properties before subnodes), indented by depth. The
    /// root prints as `/`.
    pub fn dump(&self) -> TableDump<'_> {
        TableDump { table: self }
    }

    /// Prints the diagnostic dump to stdout.
    pub fn print_dump(&self) {
        println!("{}", self.dump());
    }

    /// Fetches a NUL-terminated string property from the root node.
    fn root_string(&self, name: &str) -> Option<&str> {
        if BlobHeader::parse(self.data.as_slice()).is_err() {
            warn!("Header recheck failed; backing bytes changed since open");
            return None;
        }

        let structure = self.structure();
        let root = structure.root().ok()?;
        let value = structure.property(root, name).ok()??;
        read_cstr(value, 0).ok()
    }

    /// Decodes one `/memorys` child into a region.
    fn read_region(
        structure: StructureBlock<'_>,
        node: usize,
        width: CellWidth,
    ) -> Result<MemoryRegion> {
        Ok(MemoryRegion {
            phys: Self::read_scalar(structure, node, PHYS_PROP, width)?,
            virt: Self::read_scalar(structure, node, VIRT_PROP, width)?,
            size: Self::read_scalar(structure, node, SIZE_PROP, width)?,
        })
    }

    /// Reads a required scalar property of `node` at the given width.
    fn read_scalar(
        structure: StructureBlock<'_>,
        node: usize,
        name: &str,
        width: CellWidth,
    ) -> Result<u64> {
        let value = structure
            .property(node, name)?
            .ok_or_else(|| ResourceTableError::property_missing(name))?;
        width.read_scalar(name, value)
    }

    /// Blob bytes clipped to the declared total size.
    fn blob(&self) -> &[u8] {
        &self.data.as_slice()[..self.header.totalsize as usize]
    }

    /// Walker over the blob's structure and strings blocks.
    fn structure(&self) -> StructureBlock<'_> {
        let blob = self.blob();
        StructureBlock::new(
            &blob[self.header.struct_range()],
            &blob[self.header.strings_range()],
        )
    }
}

impl fmt::Debug for ResourceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTable")
            .field("header", &self.header)
            .field("len", &self.data.as_slice().len())
            .finish()
    }
}

/// Displayable tree dump of a [`ResourceTable`].
pub struct TableDump<'a> {
    table: &'a ResourceTable,
}

impl fmt::Display for TableDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let structure = self.table.structure();
        let mut depth = 0usize;

        for event in structure.walk() {
            match event {
                Ok(WalkEvent::BeginNode { name, .. }) => {
                    let shown = if depth == 0 && name.is_empty() { "/" } else { name };
                    writeln!(f, "{:indent$}{}", "", shown, indent = depth * 2)?;
                    depth += 1;
                }
                Ok(WalkEvent::EndNode { .. }) => depth = depth.saturating_sub(1),
                Ok(WalkEvent::Prop { name, .. }) => {
                    writeln!(f, "{:indent$}{}", "", name, indent = depth * 2)?;
                }
                Ok(WalkEvent::End { .. }) => break,
                Err(_) => {
                    // Validated at load; only reachable if a mapped file
                    // changed underneath.
                    writeln!(f, "<structure corrupted>")?;
                    break;
                }
            }
        }
        Ok(())
    }
}
