//! `LineBuf`: the in-place editable cell string.
//!
//! Storage is an `Arc<Vec<Cell>>` plus an optional `Arc`'d overlay. Taking a
//! [`LineSnapshot`] shares both `Arc`s; the next mutation goes through
//! `Arc::make_mut` and copies only if a snapshot is still alive. Readers
//! therefore never observe a mutation and the writer never waits for them.
//!
//! Every range-based operation validates its arguments before touching
//! anything: a returned error means the buffer is unchanged.
//!
//! # Double-width seams
//!
//! Structural edits (insert, delete, replace, overwrite) can separate the two
//! halves of a double-width character. After each edit the cells on either
//! side of every seam are checked and an orphaned half is erased (code
//! cleared, colors kept), so a skip cell is always preceded by its wide cell
//! and a wide cell is always followed by its skip cell.

use super::cell::{Cell, Eol, RtlStatus};
use super::overlay::{ExternalAttribute, ExternalAttributes};
use super::snapshot::LineSnapshot;
use super::string::{used_length_of, CellString, LineMetadata};
use crate::error::{check_range, BufferError, Result};
use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::Arc;

/// A mutable line of cells.
///
/// `Clone` is cheap (it shares storage) and behaves as a deep copy.
#[derive(Clone, Debug)]
pub struct LineBuf {
    /// Copy-on-write cell storage.
    cells: Arc<Vec<Cell>>,
    /// Sparse extended attributes; `None` when there are none.
    overlay: Option<Arc<ExternalAttributes>>,
    /// Line metadata.
    metadata: LineMetadata,
    /// Continuation cell; its code is the line's EOL.
    continuation: Cell,
}

impl Default for LineBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuf {
    /// Create an empty line.
    pub fn new() -> Self {
        Self::from_cells(Vec::new())
    }

    /// Create a line of `width` empty cells.
    pub fn with_width(width: usize) -> Self {
        Self::from_cells(vec![Cell::EMPTY; width])
    }

    /// Create a line of `width` copies of `cell`.
    ///
    /// Double-width cells cannot be repeated and are stored erased.
    pub fn filled(width: usize, cell: Cell) -> Self {
        let cell = if cell.is_wide() || cell.is_wide_continuation() {
            cell.erased()
        } else {
            cell
        };
        Self::from_cells(vec![cell; width])
    }

    /// Wrap an existing cell vector.
    ///
    /// Orphaned double-width halves are erased.
    pub fn from_cells(cells: Vec<Cell>) -> Self {
        let mut line = Self {
            cells: Arc::new(cells),
            overlay: None,
            metadata: LineMetadata::default(),
            continuation: Cell::continuation(Eol::Hard),
        };
        line.repair_all();
        line
    }

    pub(crate) fn from_parts(
        cells: Vec<Cell>,
        overlay: ExternalAttributes,
        metadata: LineMetadata,
        continuation: Cell,
    ) -> Self {
        Self {
            cells: Arc::new(cells),
            overlay: (!overlay.is_empty()).then(|| Arc::new(overlay)),
            metadata,
            continuation,
        }
    }

    /// Borrow the cells.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Borrow the overlay, if there is one.
    #[inline]
    pub fn overlay(&self) -> Option<&ExternalAttributes> {
        self.overlay.as_deref()
    }

    /// Get the metadata.
    #[inline]
    pub const fn metadata_ref(&self) -> &LineMetadata {
        &self.metadata
    }

    /// Replace the metadata.
    pub const fn set_metadata(&mut self, metadata: LineMetadata) {
        self.metadata = metadata;
    }

    /// Replace the continuation cell.
    pub const fn set_continuation(&mut self, continuation: Cell) {
        self.continuation = continuation;
    }

    /// Set how the line ends, keeping the continuation cell's colors.
    pub const fn set_eol(&mut self, eol: Eol) {
        self.continuation = Cell::continuation(eol)
            .with_fg(self.continuation.fg())
            .with_bg(self.continuation.bg());
    }

    /// Immutable view sharing this line's storage.
    pub fn freeze(&self) -> LineSnapshot {
        LineSnapshot::shared(
            Arc::clone(&self.cells),
            0..self.cells.len(),
            self.overlay.clone(),
            self.metadata,
            self.continuation,
        )
    }

    fn cells_mut(&mut self) -> &mut Vec<Cell> {
        Arc::make_mut(&mut self.cells)
    }

    fn overlay_mut(&mut self) -> &mut ExternalAttributes {
        Arc::make_mut(self.overlay.get_or_insert_with(Default::default))
    }

    /// Drop the overlay once it holds nothing.
    fn normalize_overlay(&mut self) {
        if self.overlay.as_ref().is_some_and(|o| o.is_empty()) {
            self.overlay = None;
        }
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.cells.len() {
            Ok(())
        } else {
            Err(BufferError::OutOfRange {
                index,
                len: self.cells.len(),
            })
        }
    }

    /// Erase whichever half of a double-width pair the seam at `s` orphaned.
    fn repair_seam(&mut self, s: usize) {
        let len = self.cells.len();
        if s > 0 && s <= len {
            let left = self.cells[s - 1];
            if left.is_wide() && (s == len || !self.cells[s].is_wide_continuation()) {
                self.cells_mut()[s - 1] = left.erased();
            }
        }
        if s < len {
            let cell = self.cells[s];
            if cell.is_wide_continuation() && (s == 0 || !self.cells[s - 1].is_wide()) {
                self.cells_mut()[s] = cell.erased();
            }
        }
    }

    fn repair_all(&mut self) {
        for s in 0..=self.cells.len() {
            self.repair_seam(s);
        }
    }

    /// Cells and rebased overlay of the whole of `other`.
    fn parts_of(other: &dyn CellString) -> (Vec<Cell>, ExternalAttributes) {
        let n = other.cell_count();
        let mut cells = Vec::with_capacity(n);
        other.copy_cells(0..n, &mut cells);
        (cells, other.attributes_in(0..n))
    }

    /// Splice `cells`/`attrs` over `range`; shared by insert, replace, append.
    fn splice(&mut self, range: Range<usize>, cells: Vec<Cell>, attrs: &ExternalAttributes) {
        let start = range.start;
        let removed = range.len();
        let added = cells.len();
        self.cells_mut().splice(range, cells);
        if self.overlay.is_some() {
            let overlay = self.overlay_mut();
            overlay.shift_for_delete(start, removed);
            overlay.shift_for_insert(start, added);
        }
        if !attrs.is_empty() {
            self.overlay_mut().copy_range(attrs, 0, start, added);
        }
        self.normalize_overlay();
        self.repair_seam(start);
        self.repair_seam(start + added);
    }

    /// Overwrite cells in place starting at `at`. Caller checked bounds.
    pub(crate) fn overwrite(&mut self, at: usize, cells: &[Cell], attrs: &ExternalAttributes) {
        let n = cells.len();
        self.cells_mut()[at..at + n].copy_from_slice(cells);
        if self.overlay.is_some() || !attrs.is_empty() {
            self.overlay_mut().copy_range(attrs, 0, at, n);
            self.normalize_overlay();
        }
        self.repair_seam(at);
        self.repair_seam(at + n);
    }

    /// Extend the line by the whole of `other`, including its overlay.
    pub fn append(&mut self, other: &dyn CellString) {
        let (cells, attrs) = Self::parts_of(other);
        let end = self.cells.len();
        self.splice(end..end, cells, &attrs);
    }

    /// Insert `other` at `index`, shifting trailing cells and attributes right.
    pub fn insert(&mut self, other: &dyn CellString, index: usize) -> Result<()> {
        if index > self.cells.len() {
            return Err(BufferError::OutOfRange {
                index,
                len: self.cells.len(),
            });
        }
        let (cells, attrs) = Self::parts_of(other);
        self.splice(index..index, cells, &attrs);
        Ok(())
    }

    /// Remove the cells in `range`, shifting trailing cells left.
    pub fn delete(&mut self, range: Range<usize>) -> Result<()> {
        check_range(&range, self.cells.len())?;
        self.splice(range, Vec::new(), &ExternalAttributes::new());
        Ok(())
    }

    /// Replace `range` with the whole of `other`.
    pub fn replace(&mut self, range: Range<usize>, other: &dyn CellString) -> Result<()> {
        check_range(&range, self.cells.len())?;
        let (cells, attrs) = Self::parts_of(other);
        self.splice(range, cells, &attrs);
        Ok(())
    }

    /// Remove the first `count` cells.
    pub fn delete_from_start(&mut self, count: usize) -> Result<()> {
        self.delete(0..count)
    }

    /// Remove the last `count` cells.
    pub fn delete_from_end(&mut self, count: usize) -> Result<()> {
        let len = self.cells.len();
        let start = len.checked_sub(count).ok_or(BufferError::OutOfRange {
            index: count,
            len,
        })?;
        self.delete(start..len)
    }

    /// Overwrite every slot with `default_cell` and clear the overlay.
    pub fn erase(&mut self, default_cell: Cell) -> Result<()> {
        if default_cell.is_wide() || default_cell.is_wide_continuation() {
            return Err(BufferError::invalid("erase cell cannot be double-width"));
        }
        self.cells_mut().fill(default_cell);
        self.overlay = None;
        Ok(())
    }

    /// Mark cells in `indexes` right-to-left and all others left-to-right.
    pub fn set_rtl_indexes(&mut self, indexes: &BTreeSet<usize>) -> Result<()> {
        if let Some(&last) = indexes.last() {
            self.check_index(last)?;
        }
        for (i, cell) in self.cells_mut().iter_mut().enumerate() {
            let status = if indexes.contains(&i) {
                RtlStatus::Rtl
            } else {
                RtlStatus::Ltr
            };
            cell.set_rtl_status(status);
        }
        self.metadata.rtl_found = !indexes.is_empty();
        Ok(())
    }

    /// Reset every cell's bidi status to unknown.
    pub fn reset_rtl_status(&mut self) {
        for cell in self.cells_mut().iter_mut() {
            cell.set_rtl_status(RtlStatus::Unknown);
        }
        self.metadata.rtl_found = false;
    }

    /// Copy `source[source_range]` onto this line's overlay at `dest_start`.
    ///
    /// `None` clears the destination range.
    pub fn set_external_attributes(
        &mut self,
        source: Option<&ExternalAttributes>,
        source_range: Range<usize>,
        dest_start: usize,
    ) -> Result<()> {
        if source_range.start > source_range.end {
            return Err(BufferError::invalid("source range is reversed"));
        }
        let count = source_range.len();
        let dest_end = dest_start
            .checked_add(count)
            .ok_or_else(|| BufferError::invalid("destination overflows"))?;
        check_range(&(dest_start..dest_end), self.cells.len())?;
        match source {
            Some(src) => {
                if self.overlay.is_none() && src.iter_range(source_range.clone()).next().is_none() {
                    return Ok(());
                }
                self.overlay_mut()
                    .copy_range(src, source_range.start, dest_start, count);
            }
            None => {
                if self.overlay.is_some() {
                    self.overlay_mut().clear_range(dest_start, count);
                }
            }
        }
        self.normalize_overlay();
        Ok(())
    }

    /// Set (or with `None`, clear) the attributes of one cell.
    pub fn set_attribute(&mut self, index: usize, attr: Option<&ExternalAttribute>) -> Result<()> {
        self.check_index(index)?;
        match attr {
            Some(a) if !a.is_empty() => self.overlay_mut().set(index, a.clone()),
            _ => {
                if self.overlay.as_ref().is_some_and(|o| o.get(index).is_some()) {
                    self.overlay_mut().set(index, ExternalAttribute::default());
                    self.normalize_overlay();
                }
            }
        }
        Ok(())
    }

    /// Write a single-width cell at `index`.
    pub fn set_character(&mut self, index: usize, cell: Cell) -> Result<()> {
        self.check_index(index)?;
        if cell.is_wide() || cell.is_wide_continuation() {
            return Err(BufferError::invalid(
                "use set_wide_character for double-width cells",
            ));
        }
        self.cells_mut()[index] = cell;
        self.repair_seam(index);
        self.repair_seam(index + 1);
        Ok(())
    }

    /// Write a double-width cell at `index` and its skip cell at `index + 1`.
    pub fn set_wide_character(&mut self, index: usize, cell: Cell) -> Result<()> {
        let right = index.checked_add(1).ok_or(BufferError::OutOfRange {
            index,
            len: self.cells.len(),
        })?;
        self.check_index(right)?;
        if !cell.is_wide() {
            return Err(BufferError::invalid("cell is not double-width"));
        }
        let cells = self.cells_mut();
        cells[index] = cell;
        cells[index + 1] = cell.continuation_of();
        self.repair_seam(index);
        self.repair_seam(index + 2);
        Ok(())
    }

    /// Fill `range` with a single-width `cell`.
    pub fn fill(&mut self, range: Range<usize>, cell: Cell) -> Result<()> {
        check_range(&range, self.cells.len())?;
        if cell.is_wide() || cell.is_wide_continuation() {
            return Err(BufferError::invalid("fill cell cannot be double-width"));
        }
        let (start, end) = (range.start, range.end);
        self.cells_mut()[range].fill(cell);
        self.repair_seam(start);
        self.repair_seam(end);
        Ok(())
    }

    /// Write ASCII `bytes` at `at` in one bulk copy, styled like `template`.
    ///
    /// `attr` is applied to every written cell; `None` clears their overlay
    /// entries.
    pub fn write_ascii(
        &mut self,
        at: usize,
        bytes: &[u8],
        template: Cell,
        attr: Option<&ExternalAttribute>,
    ) -> Result<()> {
        let end = at
            .checked_add(bytes.len())
            .ok_or_else(|| BufferError::invalid("write overflows"))?;
        check_range(&(at..end), self.cells.len())?;
        debug_assert!(bytes.is_ascii(), "write_ascii requires ASCII input");
        if bytes.is_empty() {
            return Ok(());
        }
        for (slot, &b) in self.cells_mut()[at..end].iter_mut().zip(bytes) {
            *slot = template.with_ascii(b);
        }
        match attr {
            Some(a) if !a.is_empty() => {
                let overlay = self.overlay_mut();
                for i in at..end {
                    overlay.set(i, a.clone());
                }
            }
            _ => {
                if self.overlay.is_some() {
                    self.overlay_mut().clear_range(at, bytes.len());
                    self.normalize_overlay();
                }
            }
        }
        self.repair_seam(at);
        self.repair_seam(end);
        Ok(())
    }

    /// Remove the content of the cell at `index`, keeping its colors.
    pub fn erase_code_at(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let cell = self.cells[index];
        self.cells_mut()[index] = cell.erased();
        self.repair_seam(index);
        self.repair_seam(index + 1);
        Ok(())
    }

    /// Grow with empty cells or shrink from the end to exactly `size` cells.
    pub fn set_content_size(&mut self, size: usize) {
        let len = self.cells.len();
        if size > len {
            self.cells_mut().resize(size, Cell::EMPTY);
        } else if size < len {
            self.cells_mut().truncate(size);
            if let Some(overlay) = self.overlay.as_mut() {
                Arc::make_mut(overlay).truncate(size);
            }
            self.normalize_overlay();
            self.repair_seam(size);
        }
    }

    /// Insert `other` at `index` inside a line that may not exceed `width`.
    ///
    /// The insertion succeeds only if the occupied part of the line plus the
    /// inserted cells fits in `width`; trailing empty cells are then dropped
    /// so the line keeps exactly `width` cells. Otherwise nothing changes and
    /// `OutOfRange` is returned. Inserting between the halves of a
    /// double-width character is an `InvalidArgument`.
    pub fn insert_within_width(
        &mut self,
        other: &dyn CellString,
        index: usize,
        width: usize,
    ) -> Result<()> {
        let len = self.cells.len();
        if index > len {
            return Err(BufferError::OutOfRange { index, len });
        }
        if index < len && self.cells[index].is_wide_continuation() {
            return Err(BufferError::invalid(
                "cannot insert inside a double-width character",
            ));
        }
        let used = used_length_of(&self.cells);
        let occupied = if used < len && self.cells[used].is_wide_continuation() {
            used + 1
        } else {
            used
        };
        let needed = occupied.max(index) + other.cell_count();
        if needed > width {
            return Err(BufferError::OutOfRange {
                index: needed,
                len: width,
            });
        }
        self.insert(other, index)?;
        self.set_content_size(width);
        Ok(())
    }
}

impl CellString for LineBuf {
    fn cell_count(&self) -> usize {
        self.cells.len()
    }

    fn character(&self, index: usize) -> Result<Cell> {
        self.check_index(index)?;
        Ok(self.cells[index])
    }

    fn external_attribute(&self, index: usize) -> Option<ExternalAttribute> {
        self.overlay.as_ref()?.get(index).cloned()
    }

    fn copy_cells(&self, range: Range<usize>, out: &mut Vec<Cell>) {
        out.extend_from_slice(&self.cells[range]);
    }

    fn attributes_in(&self, range: Range<usize>) -> ExternalAttributes {
        self.overlay
            .as_ref()
            .map(|o| o.slice(range.start, range.len()))
            .unwrap_or_default()
    }

    fn metadata(&self) -> LineMetadata {
        self.metadata
    }

    fn continuation(&self) -> Cell {
        self.continuation
    }

    fn substring(&self, range: Range<usize>) -> Result<LineSnapshot> {
        check_range(&range, self.cells.len())?;
        Ok(LineSnapshot::shared(
            Arc::clone(&self.cells),
            range,
            self.overlay.clone(),
            self.metadata,
            self.continuation,
        ))
    }

    fn snapshot(&self) -> LineSnapshot {
        self.freeze()
    }

    fn used_length(&self) -> usize {
        used_length_of(&self.cells)
    }

    fn string_value(&self) -> String {
        super::string::text_of(&self.cells[..used_length_of(&self.cells)])
    }
}
