//! Structure block walking: nodes, properties, children, path lookup.
//!
//! A [`StructureBlock`] borrows the structure and strings blocks of a
//! validated blob and provides the primitive tree operations every query
//! is built from: resolving a path to a node offset, iterating direct
//! children, iterating properties, and reading names. Node identity is a
//! byte offset of a `BEGIN_NODE` token inside the structure block.
//!
//! All walks are iterative, so nesting depth is bounded only by the input
//! size, never by the call stack.

use crate::cells::CellWidth;
use crate::error::{ResourceTableError, Result};
use crate::token::{StructureToken, TOKEN_END, TOKEN_END_NODE};
use crate::utils::{align4, read_cstr, read_u32_be};

/// Property a parent node uses to declare its children's scalar width.
pub const ADDRESS_CELLS_PROP: &str = "#address-cells";

/// A named property with its raw value bytes.
#[derive(Debug, Clone, Copy)]
pub struct Property<'a> {
    /// Property name, resolved from the strings block.
    pub name: &'a str,

    /// Raw value bytes, unpadded.
    pub value: &'a [u8],
}

/// Parsed pieces of one `PROP` record.
struct PropRecord<'a> {
    name: &'a str,
    value: &'a [u8],
    /// Offset of the token following the record.
    next: usize,
}

/// Zero-copy view over a blob's structure and strings blocks.
#[derive(Debug, Clone, Copy)]
pub struct StructureBlock<'a> {
    data: &'a [u8],
    strings: &'a [u8],
}

impl<'a> StructureBlock<'a> {
    /// Creates a walker over the given structure and strings block slices.
    pub fn new(data: &'a [u8], strings: &'a [u8]) -> Self {
        Self { data, strings }
    }

    /// Offset of the root node's `BEGIN_NODE` token.
    ///
    /// # Errors
    ///
    /// Fails if the block starts with anything other than padding followed
    /// by a `BEGIN_NODE`.
    pub fn root(&self) -> Result<usize> {
        let mut offset = 0;
        loop {
            let raw = read_u32_be(self.data, offset)?;
            match StructureToken::from_u32(raw, offset)? {
                StructureToken::Nop => offset += 4,
                StructureToken::BeginNode => return Ok(offset),
                _ => {
                    return Err(ResourceTableError::InvalidToken { token: raw, offset });
                }
            }
        }
    }

    /// Display name of the node at `node`.
    pub fn node_name(&self, node: usize) -> Result<&'a str> {
        self.expect_begin_node(node)?;
        read_cstr(self.data, node + 4)
    }

    /// Iterates the direct children of `node` in storage order.
    ///
    /// Items are child node offsets; a structural error inside the node
    /// body surfaces as an `Err` item and ends the iteration.
    pub fn children(&self, node: usize) -> Result<ChildIter<'a>> {
        let body = self.body_start(node)?;
        Ok(ChildIter {
            block: *self,
            offset: body,
            done: false,
        })
    }

    /// Iterates the properties of `node` in storage order.
    ///
    /// Iteration ends at the first subnode; in a well-formed blob all
    /// properties precede subnodes.
    pub fn properties(&self, node: usize) -> Result<PropertyIter<'a>> {
        let body = self.body_start(node)?;
        Ok(PropertyIter {
            block: *self,
            offset: body,
            done: false,
        })
    }

    /// Looks up a property of `node` by name.
    ///
    /// Returns `Ok(None)` when the property is absent; structural errors
    /// while scanning propagate as `Err`.
    pub fn property(&self, node: usize, name: &str) -> Result<Option<&'a [u8]>> {
        for prop in self.properties(node)? {
            let prop = prop?;
            if prop.name == name {
                return Ok(Some(prop.value));
            }
        }
        Ok(None)
    }

    /// Resolves a slash-delimited path to a node offset.
    ///
    /// Each component matches a child by exact name, or, when the
    /// component carries no unit suffix, by the child's name up to its
    /// `@`.
    ///
    /// # Errors
    ///
    /// Returns `ResourceTableError::PathNotFound` carrying the full path
    /// when any component has no matching child.
    pub fn find_path(&self, path: &str) -> Result<usize> {
        let mut node = self.root()?;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            node = self
                .find_child(node, component)?
                .ok_or_else(|| ResourceTableError::path_not_found(path))?;
        }
        Ok(node)
    }

    /// Declared address cell count of `node`, defaulting when absent.
    ///
    /// # Errors
    ///
    /// Fails if the property is present but not exactly one u32.
    pub fn address_cells(&self, node: usize) -> Result<u32> {
        match self.property(node, ADDRESS_CELLS_PROP)? {
            None => Ok(CellWidth::DEFAULT_CELLS),
            Some(value) if value.len() == 4 => read_u32_be(value, 0),
            Some(value) => Err(ResourceTableError::length_mismatch(
                ADDRESS_CELLS_PROP,
                4,
                value.len(),
            )),
        }
    }

    /// Checks the full structure block for well-formedness.
    ///
    /// Verifies token framing (well-nested `BEGIN_NODE`/`END_NODE`, a
    /// single root, `END` only at depth zero), that every property record
    /// stays inside the block and names a valid strings-block entry, that
    /// every name is NUL-terminated UTF-8, and that no property follows a
    /// subnode within the same parent.
    pub fn validate(&self) -> Result<()> {
        let mut depth = 0usize;
        let mut seen_root = false;
        // One flag per open node: has a subnode already been seen?
        let mut has_subnode = Vec::new();

        for event in self.walk() {
            match event? {
                WalkEvent::BeginNode { offset, .. } => {
                    if depth == 0 && seen_root {
                        return Err(ResourceTableError::format_error(format!(
                            "Second root node at offset {:#x}",
                            offset
                        )));
                    }
                    seen_root = true;
                    if let Some(top) = has_subnode.last_mut() {
                        *top = true;
                    }
                    depth += 1;
                    has_subnode.push(false);
                }
                WalkEvent::EndNode { offset } => {
                    if depth == 0 {
                        return Err(ResourceTableError::InvalidToken {
                            token: TOKEN_END_NODE,
                            offset,
                        });
                    }
                    depth -= 1;
                    has_subnode.pop();
                }
                WalkEvent::Prop { offset, .. } => {
                    if depth == 0 {
                        return Err(ResourceTableError::format_error(format!(
                            "Property outside any node at offset {:#x}",
                            offset
                        )));
                    }
                    if has_subnode.last() == Some(&true) {
                        return Err(ResourceTableError::format_error(format!(
                            "Property after subnode at offset {:#x}",
                            offset
                        )));
                    }
                }
                WalkEvent::End { offset } => {
                    if depth != 0 {
                        return Err(ResourceTableError::InvalidToken {
                            token: TOKEN_END,
                            offset,
                        });
                    }
                    if !seen_root {
                        return Err(ResourceTableError::format_error(
                            "Structure block has no root node".to_string(),
                        ));
                    }
                    return Ok(());
                }
            }
        }

        // walk() always yields End or an error first.
        Err(ResourceTableError::format_error(
            "Structure block not terminated".to_string(),
        ))
    }

    /// Streams the structure block as flat walk events.
    pub(crate) fn walk(&self) -> WalkIter<'a> {
        WalkIter {
            block: *self,
            offset: 0,
            done: false,
        }
    }

    /// Finds a direct child of `node` matching a path component.
    fn find_child(&self, node: usize, component: &str) -> Result<Option<usize>> {
        for child in self.children(node)? {
            let child = child?;
            let name = self.node_name(child)?;
            if name == component {
                return Ok(Some(child));
            }
            if !component.contains('@') {
                if let Some((base, _unit)) = name.split_once('@') {
                    if base == component {
                        return Ok(Some(child));
                    }
                }
            }
        }
        Ok(None)
    }

    /// Verifies that `node` points at a `BEGIN_NODE` token.
    fn expect_begin_node(&self, node: usize) -> Result<()> {
        let raw = read_u32_be(self.data, node)?;
        if StructureToken::from_u32(raw, node)? != StructureToken::BeginNode {
            return Err(ResourceTableError::InvalidToken {
                token: raw,
                offset: node,
            });
        }
        Ok(())
    }

    /// Offset of the first body token of `node`, past its name padding.
    fn body_start(&self, node: usize) -> Result<usize> {
        self.expect_begin_node(node)?;
        self.skip_name(node + 4)
    }

    /// Skips a node name starting at `offset`, returning the next aligned
    /// token offset.
    fn skip_name(&self, offset: usize) -> Result<usize> {
        let name = read_cstr(self.data, offset)?;
        Ok(align4(offset + name.len() + 1))
    }

    /// Parses the `PROP` record whose length field starts at `offset`.
    fn parse_prop(&self, offset: usize) -> Result<PropRecord<'a>> {
        let len = read_u32_be(self.data, offset)? as usize;
        let nameoff = read_u32_be(self.data, offset + 4)? as usize;
        let value_start = offset + 8;

        if len > self.data.len().saturating_sub(value_start) {
            return Err(ResourceTableError::TruncatedData {
                offset: value_start,
                expected: len,
                actual: self.data.len().saturating_sub(value_start),
            });
        }

        let name = read_cstr(self.strings, nameoff)?;
        Ok(PropRecord {
            name,
            value: &self.data[value_start..value_start + len],
            next: align4(value_start + len),
        })
    }

    /// Advances past the whole subtree rooted at `node`, returning the
    /// offset of the token after its `END_NODE`.
    fn skip_node(&self, node: usize) -> Result<usize> {
        self.expect_begin_node(node)?;
        let mut offset = node;
        let mut depth = 0usize;

        loop {
            let token_offset = offset;
            let raw = read_u32_be(self.data, offset)?;
            offset += 4;
            match StructureToken::from_u32(raw, token_offset)? {
                StructureToken::BeginNode => {
                    offset = self.skip_name(offset)?;
                    depth += 1;
                }
                StructureToken::EndNode => {
                    if depth == 0 {
                        return Err(ResourceTableError::InvalidToken {
                            token: raw,
                            offset: token_offset,
                        });
                    }
                    depth -= 1;
                    if depth == 0 {
                        return Ok(offset);
                    }
                }
                StructureToken::Prop => {
                    offset = self.parse_prop(offset)?.next;
                }
                StructureToken::Nop => {}
                StructureToken::End => {
                    return Err(ResourceTableError::InvalidToken {
                        token: raw,
                        offset: token_offset,
                    });
                }
            }
        }
    }
}

/// Flat traversal events over a structure block.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WalkEvent<'a> {
    /// A node opens. `offset` identifies the node.
    BeginNode { name: &'a str, offset: usize },
    /// The current node closes.
    EndNode { offset: usize },
    /// A property of the current node.
    Prop { name: &'a str, offset: usize },
    /// End of the structure block.
    End { offset: usize },
}

/// Iterator yielding [`WalkEvent`]s; fuses after an error or `End`.
pub(crate) struct WalkIter<'a> {
    block: StructureBlock<'a>,
    offset: usize,
    done: bool,
}

impl<'a> Iterator for WalkIter<'a> {
    type Item = Result<WalkEvent<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let token_offset = self.offset;
            let raw = match read_u32_be(self.block.data, token_offset) {
                Ok(raw) => raw,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let token = match StructureToken::from_u32(raw, token_offset) {
                Ok(token) => token,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            self.offset = token_offset + 4;
            match token {
                StructureToken::Nop => {}
                StructureToken::BeginNode => {
                    let event = read_cstr(self.block.data, self.offset).map(|name| {
                        self.offset = align4(self.offset + name.len() + 1);
                        WalkEvent::BeginNode {
                            name,
                            offset: token_offset,
                        }
                    });
                    if event.is_err() {
                        self.done = true;
                    }
                    return Some(event);
                }
                StructureToken::EndNode => {
                    return Some(Ok(WalkEvent::EndNode {
                        offset: token_offset,
                    }));
                }
                StructureToken::Prop => {
                    let event = self.block.parse_prop(self.offset).map(|record| {
                        self.offset = record.next;
                        WalkEvent::Prop {
                            name: record.name,
                            offset: token_offset,
                        }
                    });
                    if event.is_err() {
                        self.done = true;
                    }
                    return Some(event);
                }
                StructureToken::End => {
                    self.done = true;
                    return Some(Ok(WalkEvent::End {
                        offset: token_offset,
                    }));
                }
            }
        }
    }
}

/// Iterator over a node's direct child offsets; fuses after an error.
pub struct ChildIter<'a> {
    block: StructureBlock<'a>,
    offset: usize,
    done: bool,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let token_offset = self.offset;
            let raw = match read_u32_be(self.block.data, token_offset) {
                Ok(raw) => raw,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let token = match StructureToken::from_u32(raw, token_offset) {
                Ok(token) => token,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match token {
                StructureToken::Nop => self.offset = token_offset + 4,
                StructureToken::Prop => match self.block.parse_prop(token_offset + 4) {
                    Ok(record) => self.offset = record.next,
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                StructureToken::BeginNode => match self.block.skip_node(token_offset) {
                    Ok(next) => {
                        self.offset = next;
                        return Some(Ok(token_offset));
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                StructureToken::EndNode => {
                    self.done = true;
                    return None;
                }
                StructureToken::End => {
                    self.done = true;
                    return Some(Err(ResourceTableError::InvalidToken {
                        token: raw,
                        offset: token_offset,
                    }));
                }
            }
        }
    }
}

/// Iterator over a node's properties; stops at the first subnode.
pub struct PropertyIter<'a> {
    block: StructureBlock<'a>,
    offset: usize,
    done: bool,
}

impl<'a> Iterator for PropertyIter<'a> {
    type Item = Result<Property<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let token_offset = self.offset;
            let raw = match read_u32_be(self.block.data, token_offset) {
                Ok(raw) => raw,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let token = match StructureToken::from_u32(raw, token_offset) {
                Ok(token) => token,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            match token {
                StructureToken::Nop => self.offset = token_offset + 4,
                StructureToken::Prop => match self.block.parse_prop(token_offset + 4) {
                    Ok(record) => {
                        self.offset = record.next;
                        return Some(Ok(Property {
                            name: record.name,
                            value: record.value,
                        }));
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
                StructureToken::BeginNode | StructureToken::EndNode | StructureToken::End => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
