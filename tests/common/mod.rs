//! Shared test support: byte-level assembly of resource table blobs.

#![allow(dead_code)]

use std::collections::HashMap;

use resource_table::token::{TOKEN_BEGIN_NODE, TOKEN_END, TOKEN_END_NODE, TOKEN_NOP, TOKEN_PROP};
use resource_table::{BLOB_MAGIC, HEADER_SIZE};

/// Assembles resource table blobs byte by byte.
///
/// The layout matches the wire format: header, reservation block (entries
/// plus the all-zero terminator), structure block (tokens pushed in call
/// order, `END` appended by `finish`), strings block (names interned on
/// first use).
pub struct BlobBuilder {
    structure: Vec<u8>,
    strings: Vec<u8>,
    string_offsets: HashMap<String, u32>,
    reservations: Vec<(u64, u64)>,
}

impl BlobBuilder {
    pub fn new() -> Self {
        Self {
            structure: Vec::new(),
            strings: Vec::new(),
            string_offsets: HashMap::new(),
            reservations: Vec::new(),
        }
    }

    /// Adds a reservation block entry.
    pub fn reserve(&mut self, address: u64, size: u64) -> &mut Self {
        self.reservations.push((address, size));
        self
    }

    /// Opens a node. The root node's name is the empty string.
    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.push_token(TOKEN_BEGIN_NODE);
        self.structure.extend_from_slice(name.as_bytes());
        self.structure.push(0);
        self.pad();
        self
    }

    /// Closes the most recently opened node.
    pub fn end_node(&mut self) -> &mut Self {
        self.push_token(TOKEN_END_NODE);
        self
    }

    /// Inserts a padding token.
    pub fn nop(&mut self) -> &mut Self {
        self.push_token(TOKEN_NOP);
        self
    }

    /// Attaches a raw-valued property to the open node.
    pub fn prop(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let nameoff = self.intern(name);
        self.push_token(TOKEN_PROP);
        self.structure
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.structure.extend_from_slice(&nameoff.to_be_bytes());
        self.structure.extend_from_slice(value);
        self.pad();
        self
    }

    /// Attaches a NUL-terminated string property.
    pub fn prop_str(&mut self, name: &str, value: &str) -> &mut Self {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.prop(name, &bytes)
    }

    /// Attaches a big-endian u32 property.
    pub fn prop_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    /// Attaches a big-endian u64 property.
    pub fn prop_u64(&mut self, name: &str, value: u64) -> &mut Self {
        self.prop(name, &value.to_be_bytes())
    }

    /// Assembles the blob: header, reservation block, structure block
    /// (with `END` appended), strings block.
    pub fn finish(&self) -> Vec<u8> {
        let mut structure = self.structure.clone();
        structure.extend_from_slice(&TOKEN_END.to_be_bytes());

        let mut rsvmap = Vec::new();
        for &(address, size) in &self.reservations {
            rsvmap.extend_from_slice(&address.to_be_bytes());
            rsvmap.extend_from_slice(&size.to_be_bytes());
        }
        rsvmap.extend_from_slice(&[0u8; 16]);

        let off_mem_rsvmap = HEADER_SIZE as u32;
        let off_dt_struct = off_mem_rsvmap + rsvmap.len() as u32;
        let off_dt_strings = off_dt_struct + structure.len() as u32;
        let totalsize = off_dt_strings + self.strings.len() as u32;

        let mut blob = Vec::with_capacity(totalsize as usize);
        for field in [
            BLOB_MAGIC,
            totalsize,
            off_dt_struct,
            off_dt_strings,
            off_mem_rsvmap,
            17,
            17,
            0,
            self.strings.len() as u32,
            structure.len() as u32,
        ] {
            blob.extend_from_slice(&field.to_be_bytes());
        }
        blob.extend_from_slice(&rsvmap);
        blob.extend_from_slice(&structure);
        blob.extend_from_slice(&self.strings);
        blob
    }

    fn push_token(&mut self, token: u32) {
        self.structure.extend_from_slice(&token.to_be_bytes());
    }

    fn pad(&mut self) {
        while self.structure.len() % 4 != 0 {
            self.structure.push(0);
        }
    }

    fn intern(&mut self, name: &str) -> u32 {
        if let Some(&offset) = self.string_offsets.get(name) {
            return offset;
        }
        let offset = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.string_offsets.insert(name.to_string(), offset);
        offset
    }
}

impl Default for BlobBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Blob for the canonical partition used across tests: identity strings,
/// one 64-bit memory region, two devices.
pub fn sample_table() -> Vec<u8> {
    let mut builder = BlobBuilder::new();
    builder
        .begin_node("")
        .prop_str("cell_name", "cellA")
        .prop_str("cpu_name", "cpuA")
        .begin_node("memorys")
        .prop_u32("#address-cells", 2)
        .begin_node("mem@0")
        .prop_u64("phys", 0x1000)
        .prop_u64("virt", 0x2000)
        .prop_u64("size", 0x3000)
        .end_node()
        .end_node()
        .begin_node("devices")
        .begin_node("uart0")
        .end_node()
        .begin_node("timer0")
        .end_node()
        .end_node()
        .end_node();
    builder.finish()
}
