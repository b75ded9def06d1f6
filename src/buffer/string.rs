//! The read capability shared by every cell string representation.
//!
//! [`CellString`] is implemented by a small closed set of types:
//!
//! | Type            | Storage                                   | Used by                |
//! |-----------------|-------------------------------------------|------------------------|
//! | [`LineBuf`]     | owned, copy-on-write cell vector          | the writer             |
//! | [`LineSnapshot`]| shared, immutable window into a cell vec  | readers, scrollback    |
//! | [`AsciiRun`]    | ASCII bytes plus one template cell        | bulk ingestion         |
//! | [`UniformRun`]  | one cell repeated                         | erase, padding         |
//!
//! Implementors provide a handful of primitives; everything else (substring,
//! hydrate, equality, encoding) is built on top of them here.
//!
//! [`LineBuf`]: super::LineBuf
//! [`LineSnapshot`]: super::LineSnapshot
//! [`AsciiRun`]: super::AsciiRun
//! [`UniformRun`]: super::UniformRun

use super::cell::{Cell, Eol};
use super::codec;
use super::line_buf::LineBuf;
use super::overlay::{ExternalAttribute, ExternalAttributes};
use super::snapshot::LineSnapshot;
use crate::error::{check_range, BufferError, Result};
use std::ops::Range;

/// Line-level metadata carried next to the cells.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetadata {
    /// Monotonic counter identifying the line within its screen.
    pub generation: u64,
    /// Seconds since an arbitrary epoch when the line was last written.
    pub timestamp: f64,
    /// Whether a bidi pass found right-to-left text.
    pub rtl_found: bool,
}

/// Read-only access to a run of cells.
pub trait CellString: std::fmt::Debug + Send + Sync {
    /// Total slot count, including unused trailing slots.
    fn cell_count(&self) -> usize;

    /// The cell at `index`.
    fn character(&self, index: usize) -> Result<Cell>;

    /// Extended attributes of the cell at `index`, if any.
    fn external_attribute(&self, index: usize) -> Option<ExternalAttribute>;

    /// Append the cells of `range` to `out`. The range is already validated.
    fn copy_cells(&self, range: Range<usize>, out: &mut Vec<Cell>);

    /// Overlay entries inside `range`, rebased so `range.start` becomes 0.
    /// The range is already validated.
    fn attributes_in(&self, range: Range<usize>) -> ExternalAttributes;

    /// Line metadata.
    fn metadata(&self) -> LineMetadata {
        LineMetadata::default()
    }

    /// Continuation cell; its code is the line's [`Eol`].
    fn continuation(&self) -> Cell {
        Cell::continuation(Eol::Hard)
    }

    /// `0..cell_count()`
    fn full_range(&self) -> Range<usize> {
        0..self.cell_count()
    }

    /// True if there are no cells at all.
    fn is_empty(&self) -> bool {
        self.cell_count() == 0
    }

    /// How the line ends, decoded from the continuation cell.
    fn eol(&self) -> Eol {
        Eol::from_code(self.continuation().code()).unwrap_or_default()
    }

    /// Immutable copy of `range`.
    fn substring(&self, range: Range<usize>) -> Result<LineSnapshot> {
        check_range(&range, self.cell_count())?;
        let mut cells = Vec::with_capacity(range.len());
        self.copy_cells(range.clone(), &mut cells);
        Ok(LineSnapshot::from_parts(
            cells,
            self.attributes_in(range),
            self.metadata(),
            self.continuation(),
        ))
    }

    /// Raw copy of the cells in `range`.
    fn hydrate_cells(&self, range: Range<usize>) -> Result<Vec<Cell>> {
        check_range(&range, self.cell_count())?;
        let mut cells = Vec::with_capacity(range.len());
        self.copy_cells(range, &mut cells);
        Ok(cells)
    }

    /// Overwrite `dest[dest_index..dest_index + range.len()]` with the cells
    /// and overlay entries of `range`.
    ///
    /// Both sides are bounds checked before `dest` is touched.
    fn hydrate(&self, range: Range<usize>, dest: &mut LineBuf, dest_index: usize) -> Result<()> {
        check_range(&range, self.cell_count())?;
        let end = dest_index
            .checked_add(range.len())
            .ok_or_else(|| BufferError::invalid("destination index overflows"))?;
        check_range(&(dest_index..end), dest.cell_count())?;
        let mut cells = Vec::with_capacity(range.len());
        self.copy_cells(range.clone(), &mut cells);
        let attrs = self.attributes_in(range);
        dest.overwrite(dest_index, &cells, &attrs);
        Ok(())
    }

    /// True iff both strings have the same cells and overlay attributes.
    fn is_equal(&self, other: &dyn CellString) -> bool {
        let count = self.cell_count();
        if count != other.cell_count() {
            return false;
        }
        let mut lhs = Vec::with_capacity(count);
        let mut rhs = Vec::with_capacity(count);
        self.copy_cells(0..count, &mut lhs);
        other.copy_cells(0..count, &mut rhs);
        lhs == rhs && self.attributes_in(0..count) == other.attributes_in(0..count)
    }

    /// Immutable, independently owned copy of the whole string.
    fn snapshot(&self) -> LineSnapshot {
        let mut cells = Vec::with_capacity(self.cell_count());
        self.copy_cells(self.full_range(), &mut cells);
        LineSnapshot::from_parts(
            cells,
            self.attributes_in(self.full_range()),
            self.metadata(),
            self.continuation(),
        )
    }

    /// Encode `range` in the TLV wire format.
    fn encode(&self, range: Range<usize>) -> Result<Vec<u8>> {
        codec::encode(self, range)
    }

    /// One past the last cell that is neither empty nor a skip cell.
    fn used_length(&self) -> usize {
        let mut cells = Vec::with_capacity(self.cell_count());
        self.copy_cells(self.full_range(), &mut cells);
        used_length_of(&cells)
    }

    /// Indexes of skip cells (right halves of double-width characters).
    fn double_width_indexes(&self) -> Vec<usize> {
        let mut cells = Vec::with_capacity(self.cell_count());
        self.copy_cells(self.full_range(), &mut cells);
        cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_wide_continuation())
            .map(|(i, _)| i)
            .collect()
    }

    /// Text of the used part of the string. Empty cells become spaces.
    fn string_value(&self) -> String {
        let mut cells = Vec::with_capacity(self.cell_count());
        self.copy_cells(self.full_range(), &mut cells);
        text_of(&cells[..used_length_of(&cells)])
    }
}

/// Used length of a cell slice.
pub fn used_length_of(cells: &[Cell]) -> usize {
    cells
        .iter()
        .rposition(Cell::has_content)
        .map_or(0, |i| i + 1)
}

/// Render cells as text: skip cells vanish, empty cells become spaces.
pub fn text_of(cells: &[Cell]) -> String {
    let mut out = String::with_capacity(cells.len());
    for cell in cells {
        if cell.is_wide_continuation() {
            continue;
        }
        match cell.grapheme() {
            Some(g) => g.push_to(&mut out),
            None => out.push(' '),
        }
    }
    out
}
