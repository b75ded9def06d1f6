//! Immutable, shareable line views.

use super::cell::Cell;
use super::line_buf::LineBuf;
use super::overlay::{ExternalAttribute, ExternalAttributes};
use super::string::{used_length_of, CellString, LineMetadata};
use crate::error::{check_range, BufferError, Result};
use std::ops::Range;
use std::sync::Arc;

/// A frozen window into a cell vector.
///
/// Cloning and taking a substring are O(1): both share the underlying
/// storage and only adjust the window. The overlay is stored in the indices
/// of the full vector and read through the window offset.
#[derive(Clone, Debug)]
pub struct LineSnapshot {
    cells: Arc<Vec<Cell>>,
    window: Range<usize>,
    overlay: Option<Arc<ExternalAttributes>>,
    metadata: LineMetadata,
    continuation: Cell,
}

impl LineSnapshot {
    /// Build a snapshot that owns fresh storage.
    pub fn from_parts(
        cells: Vec<Cell>,
        overlay: ExternalAttributes,
        metadata: LineMetadata,
        continuation: Cell,
    ) -> Self {
        let len = cells.len();
        Self {
            cells: Arc::new(cells),
            window: 0..len,
            overlay: (!overlay.is_empty()).then(|| Arc::new(overlay)),
            metadata,
            continuation,
        }
    }

    pub(crate) fn shared(
        cells: Arc<Vec<Cell>>,
        window: Range<usize>,
        overlay: Option<Arc<ExternalAttributes>>,
        metadata: LineMetadata,
        continuation: Cell,
    ) -> Self {
        Self {
            cells,
            window,
            overlay,
            metadata,
            continuation,
        }
    }

    /// The cells inside the window.
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells[self.window.clone()]
    }

    /// A mutable copy of this line.
    ///
    /// Cells are copied as they are: a window that cut a double-width pair
    /// keeps its orphaned half.
    pub fn to_line_buf(&self) -> LineBuf {
        LineBuf::from_parts(
            self.cells().to_vec(),
            self.attributes_in(0..self.window.len()),
            self.metadata,
            self.continuation,
        )
    }
}

impl CellString for LineSnapshot {
    fn cell_count(&self) -> usize {
        self.window.len()
    }

    fn character(&self, index: usize) -> Result<Cell> {
        self.cells()
            .get(index)
            .copied()
            .ok_or(BufferError::OutOfRange {
                index,
                len: self.window.len(),
            })
    }

    fn external_attribute(&self, index: usize) -> Option<ExternalAttribute> {
        if index >= self.window.len() {
            return None;
        }
        self.overlay
            .as_ref()?
            .get(self.window.start + index)
            .cloned()
    }

    fn copy_cells(&self, range: Range<usize>, out: &mut Vec<Cell>) {
        out.extend_from_slice(&self.cells()[range]);
    }

    fn attributes_in(&self, range: Range<usize>) -> ExternalAttributes {
        self.overlay
            .as_ref()
            .map(|o| o.slice(self.window.start + range.start, range.len()))
            .unwrap_or_default()
    }

    fn metadata(&self) -> LineMetadata {
        self.metadata
    }

    fn continuation(&self) -> Cell {
        self.continuation
    }

    fn substring(&self, range: Range<usize>) -> Result<LineSnapshot> {
        check_range(&range, self.window.len())?;
        let start = self.window.start;
        Ok(Self {
            window: start + range.start..start + range.end,
            ..self.clone()
        })
    }

    fn snapshot(&self) -> LineSnapshot {
        self.clone()
    }

    fn used_length(&self) -> usize {
        used_length_of(self.cells())
    }

    fn string_value(&self) -> String {
        let cells = self.cells();
        super::string::text_of(&cells[..used_length_of(cells)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{AsciiRun, Hyperlink};

    fn line(text: &str) -> LineBuf {
        let mut l = LineBuf::new();
        l.append(&AsciiRun::new(text.as_bytes().to_vec(), Cell::EMPTY));
        l
    }

    #[test]
    fn test_substring_shares_storage() {
        let l = line("hello world");
        let snap = l.snapshot();
        let sub = snap.substring(6..11).unwrap();
        assert_eq!(sub.string_value(), "world");
        assert!(Arc::ptr_eq(&snap.cells, &sub.cells));
        let sub2 = sub.substring(1..3).unwrap();
        assert_eq!(sub2.string_value(), "or");
        assert!(sub.substring(3..6).is_err());
    }

    #[test]
    fn test_window_reads_overlay_at_offset() {
        let mut l = line("abcdef");
        let attr = ExternalAttribute::with_hyperlink(Hyperlink::new("u"));
        l.set_attribute(4, Some(&attr)).unwrap();
        let sub = l.snapshot().substring(3..6).unwrap();
        assert_eq!(sub.external_attribute(1), Some(attr.clone()));
        assert_eq!(sub.external_attribute(0), None);
        assert_eq!(sub.attributes_in(0..3).get(1), Some(&attr));
        assert_eq!(sub.external_attribute(7), None);
    }

    #[test]
    fn test_to_line_buf_is_independent() {
        let snap = line("abc").snapshot();
        let mut copy = snap.to_line_buf();
        copy.set_character(0, Cell::ascii(b'z')).unwrap();
        assert_eq!(snap.string_value(), "abc");
        assert_eq!(copy.string_value(), "zbc");
    }
}
