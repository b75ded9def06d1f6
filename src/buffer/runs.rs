//! Lightweight cell strings that synthesize cells on demand.

use super::cell::Cell;
use super::overlay::{ExternalAttribute, ExternalAttributes};
use super::string::CellString;
use crate::error::{BufferError, Result};
use std::ops::Range;

/// A run of ASCII bytes rendered with one template cell.
///
/// Stores one byte per cell. Used by bulk ingestion, where a token's bytes
/// become cells only when they are copied into a line.
#[derive(Clone, Debug)]
pub struct AsciiRun {
    bytes: Vec<u8>,
    template: Cell,
    attribute: Option<ExternalAttribute>,
}

impl AsciiRun {
    /// Create a run without extended attributes.
    pub fn new(bytes: Vec<u8>, template: Cell) -> Self {
        debug_assert!(bytes.is_ascii(), "AsciiRun requires ASCII bytes");
        Self {
            bytes,
            template,
            attribute: None,
        }
    }

    /// Create a run whose every cell carries `attribute`.
    pub fn with_attribute(bytes: Vec<u8>, template: Cell, attribute: ExternalAttribute) -> Self {
        let mut run = Self::new(bytes, template);
        run.attribute = (!attribute.is_empty()).then_some(attribute);
        run
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl CellString for AsciiRun {
    fn cell_count(&self) -> usize {
        self.bytes.len()
    }

    fn character(&self, index: usize) -> Result<Cell> {
        self.bytes
            .get(index)
            .map(|&b| self.template.with_ascii(b))
            .ok_or(BufferError::OutOfRange {
                index,
                len: self.bytes.len(),
            })
    }

    fn external_attribute(&self, index: usize) -> Option<ExternalAttribute> {
        if index < self.bytes.len() {
            self.attribute.clone()
        } else {
            None
        }
    }

    fn copy_cells(&self, range: Range<usize>, out: &mut Vec<Cell>) {
        out.extend(self.bytes[range].iter().map(|&b| self.template.with_ascii(b)));
    }

    fn attributes_in(&self, range: Range<usize>) -> ExternalAttributes {
        match &self.attribute {
            Some(a) => (0..range.len()).map(|i| (i, a.clone())).collect(),
            None => ExternalAttributes::new(),
        }
    }
}

/// One cell repeated `len` times.
#[derive(Clone, Copy, Debug)]
pub struct UniformRun {
    cell: Cell,
    len: usize,
}

impl UniformRun {
    /// Create a run. Double-width cells cannot repeat and are stored erased.
    pub const fn new(cell: Cell, len: usize) -> Self {
        let cell = if cell.is_wide() || cell.is_wide_continuation() {
            cell.erased()
        } else {
            cell
        };
        Self { cell, len }
    }
}

impl CellString for UniformRun {
    fn cell_count(&self) -> usize {
        self.len
    }

    fn character(&self, index: usize) -> Result<Cell> {
        if index < self.len {
            Ok(self.cell)
        } else {
            Err(BufferError::OutOfRange {
                index,
                len: self.len,
            })
        }
    }

    fn external_attribute(&self, _index: usize) -> Option<ExternalAttribute> {
        None
    }

    fn copy_cells(&self, range: Range<usize>, out: &mut Vec<Cell>) {
        out.extend(std::iter::repeat(self.cell).take(range.len()));
    }

    fn attributes_in(&self, _range: Range<usize>) -> ExternalAttributes {
        ExternalAttributes::new()
    }

    fn used_length(&self) -> usize {
        if self.cell.has_content() {
            self.len
        } else {
            0
        }
    }
}
