//! Point-in-time copy of a screen for readers.

use super::{compact_dump, Cursor, Scrollback};
use crate::buffer::{CellString, LineSnapshot};

/// An immutable screen: frozen grid rows plus a shared view of history.
///
/// Building one costs one `Arc` clone per grid row and per scrollback chunk.
/// Nothing the writer does afterwards is visible through it.
#[derive(Debug, Clone)]
pub struct ScreenSnapshot {
    width: usize,
    height: usize,
    lines: Vec<LineSnapshot>,
    scrollback: Scrollback,
    cursor: Cursor,
    sequence: u64,
}

impl ScreenSnapshot {
    pub(crate) const fn new(
        width: usize,
        height: usize,
        lines: Vec<LineSnapshot>,
        scrollback: Scrollback,
        cursor: Cursor,
    ) -> Self {
        Self {
            width,
            height,
            lines,
            scrollback,
            cursor,
            sequence: 0,
        }
    }

    /// Tag the snapshot with the publisher's sequence number.
    #[must_use]
    pub(crate) const fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Columns.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Rows.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Cursor at the time of the snapshot.
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Publication sequence number; 0 for snapshots taken directly.
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Grid row `y`.
    pub fn line(&self, y: usize) -> Option<&LineSnapshot> {
        self.lines.get(y)
    }

    /// Grid rows, top first.
    pub fn lines(&self) -> &[LineSnapshot] {
        &self.lines
    }

    /// History at the time of the snapshot.
    pub const fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Grid rows as text, `.` for empty cells.
    pub fn compact_dump(&self) -> String {
        compact_dump(self.lines.iter().map(|l| l as &dyn CellString))
    }

    /// Scrollback then grid rows as text, `.` for empty cells.
    pub fn compact_dump_with_history(&self) -> String {
        compact_dump(
            self.scrollback
                .iter()
                .chain(self.lines.iter())
                .map(|l| l as &dyn CellString),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::screen::Screen;

    #[test]
    fn test_snapshot_is_isolated_from_writer() {
        let mut screen = Screen::new(4, 2, 10).unwrap();
        screen.append_string_at_cursor("ab");
        let snap = screen.snapshot();
        screen.append_string_at_cursor("cd\r\nef\r\ngh");
        assert_eq!(snap.compact_dump_with_history(), "ab..\n....");
        assert_eq!(snap.cursor().x, 2);
        assert_eq!(screen.compact_dump_with_history(), "abcd\nef..\ngh..");
    }
}
