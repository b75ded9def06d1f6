//! Screen module: the writer-side grid the ingestion paths write into.
//!
//! A [`Screen`] is a fixed-size grid of [`LineBuf`] rows, a cursor with a
//! deferred wrap, the current [`Pen`], and a bounded [`Scrollback`] of
//! frozen lines. It has two ways in:
//!
//! - the general path ([`Screen::append_string_at_cursor`],
//!   [`Screen::carriage_return`], [`Screen::line_feed`]) which handles any
//!   text one grapheme at a time;
//! - the bulk path ([`Screen::append_mixed_ascii_gang`]) which writes whole
//!   ASCII runs with one copy per row.
//!
//! Both paths produce identical screens for the same input.

mod gang;
mod scrollback;
mod snapshot;
mod token;

pub use scrollback::Scrollback;
pub use snapshot::ScreenSnapshot;
pub use token::{GangToken, Token};

use crate::buffer::{Cell, CellString, Eol, ExternalAttribute, LineBuf, LineMetadata};
use crate::error::{BufferError, Result};
use std::collections::VecDeque;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Column.
    pub x: usize,
    /// Row within the grid.
    pub y: usize,
    /// Set after writing the last column; the next printable wraps first.
    pub pending_wrap: bool,
}

/// Style applied to newly written text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pen {
    /// Colors and style. Its code and width flags are ignored.
    pub cell: Cell,
    /// Extended attributes for new cells.
    pub attribute: Option<ExternalAttribute>,
}

/// The writer's grid plus history.
#[derive(Debug)]
pub struct Screen {
    width: usize,
    height: usize,
    grid: VecDeque<LineBuf>,
    cursor: Cursor,
    pen: Pen,
    scrollback: Scrollback,
    next_generation: u64,
    now: f64,
}

impl Screen {
    /// Create a blank screen.
    ///
    /// `width` must be at least 2 so a double-width character always fits on
    /// a fresh line, and `height` at least 1.
    pub fn new(width: usize, height: usize, max_scrollback_lines: usize) -> Result<Self> {
        if width < 2 || height == 0 {
            return Err(BufferError::invalid(format!(
                "screen size {width}x{height} is too small"
            )));
        }
        let mut screen = Self {
            width,
            height,
            grid: VecDeque::with_capacity(height),
            cursor: Cursor::default(),
            pen: Pen::default(),
            scrollback: Scrollback::new(max_scrollback_lines),
            next_generation: 0,
            now: 0.0,
        };
        for _ in 0..height {
            let line = screen.blank_line();
            screen.grid.push_back(line);
        }
        Ok(screen)
    }

    /// Columns.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Rows.
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Current cursor.
    pub const fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Current pen.
    pub const fn pen(&self) -> &Pen {
        &self.pen
    }

    /// History of lines that scrolled off the top.
    pub const fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Row `y` of the grid.
    pub fn line(&self, y: usize) -> Option<&LineBuf> {
        self.grid.get(y)
    }

    /// Iterate over grid rows, top first.
    pub fn lines(&self) -> impl Iterator<Item = &LineBuf> {
        self.grid.iter()
    }

    /// Set the time stamped onto lines as they are written, in seconds.
    pub fn set_time(&mut self, seconds: f64) {
        self.now = seconds;
    }

    /// Replace the pen's colors and style.
    pub fn set_pen(&mut self, cell: Cell) {
        self.pen.cell = cell.erased();
    }

    /// Replace the extended attributes applied to new text.
    pub fn set_pen_attribute(&mut self, attribute: Option<ExternalAttribute>) {
        self.pen.attribute = attribute.filter(|a| !a.is_empty());
    }

    /// Move the cursor, clamped to the grid. Clears a pending wrap.
    pub fn move_cursor(&mut self, x: usize, y: usize) {
        self.cursor = Cursor {
            x: x.min(self.width - 1),
            y: y.min(self.height - 1),
            pending_wrap: false,
        };
    }

    /// Change the scrollback capacity, evicting the oldest lines if needed.
    pub fn set_max_scrollback_lines(&mut self, max_lines: usize) {
        self.scrollback.set_max_lines(max_lines);
    }

    /// Apply one decoded token.
    pub fn apply(&mut self, token: &Token) {
        match token {
            Token::Text { text } => self.append_string_at_cursor(text),
            Token::CarriageReturn => self.carriage_return(),
            Token::LineFeed => self.line_feed(),
            Token::CarriageReturnLineFeed => self.append_carriage_return_line_feed(),
            Token::SetPen(cell) => self.set_pen(*cell),
            Token::SetPenAttribute(attr) => self.set_pen_attribute(attr.clone()),
            Token::Gang(tokens) => self.append_mixed_ascii_gang(tokens),
        }
    }

    /// Print `text` at the cursor one grapheme cluster at a time.
    ///
    /// CR and LF are honored; other control characters are ignored. Text
    /// reaching the last column wraps onto the next line, marking the line
    /// [`Eol::Soft`]. A double-width character that does not fit in the last
    /// column leaves it empty and wraps early, marking the line [`Eol::Dwc`].
    pub fn append_string_at_cursor(&mut self, text: &str) {
        for grapheme in text.graphemes(true) {
            match grapheme {
                "\r\n" => self.append_carriage_return_line_feed(),
                "\r" => self.carriage_return(),
                "\n" => self.line_feed(),
                g if g.chars().all(char::is_control) => {}
                g => self.put_grapheme(g),
            }
        }
    }

    /// Move the cursor to column 0.
    pub fn carriage_return(&mut self) {
        self.cursor.x = 0;
        self.cursor.pending_wrap = false;
    }

    /// Move the cursor down one row, scrolling the top row into history at
    /// the bottom. The column and a pending wrap are kept.
    pub fn line_feed(&mut self) {
        self.advance_line();
    }

    /// Carriage return then line feed.
    pub fn append_carriage_return_line_feed(&mut self) {
        self.carriage_return();
        self.line_feed();
    }

    fn put_grapheme(&mut self, grapheme: &str) {
        let wide = UnicodeWidthStr::width(grapheme) >= 2;
        if self.cursor.pending_wrap {
            self.wrap(Eol::Soft);
        }
        if wide && self.cursor.x == self.width - 1 {
            let (x, y) = (self.cursor.x, self.cursor.y);
            self.with_line(y, |line| line.erase_code_at(x));
            self.wrap(Eol::Dwc);
        }

        let x = self.cursor.x;
        let y = self.cursor.y;
        let pen = self.pen.clone();
        let cell = pen.cell.with_grapheme(grapheme);
        let span = if wide { 2 } else { 1 };
        self.with_line(y, |line| {
            if wide {
                line.set_wide_character(x, cell)?;
            } else {
                line.set_character(x, cell)?;
            }
            for i in x..x + span {
                line.set_attribute(i, pen.attribute.as_ref())?;
            }
            Ok(())
        });
        self.advance_cursor(span);
    }

    /// Move the cursor right after writing `n` cells.
    pub(crate) fn advance_cursor(&mut self, n: usize) {
        let next = self.cursor.x + n;
        if next >= self.width {
            self.cursor.x = self.width - 1;
            self.cursor.pending_wrap = true;
        } else {
            self.cursor.x = next;
        }
    }

    /// Mark the current line as wrapped and continue at the next line start.
    pub(crate) fn wrap(&mut self, eol: Eol) {
        let y = self.cursor.y;
        if let Some(line) = self.grid.get_mut(y) {
            line.set_eol(eol);
        }
        self.cursor.x = 0;
        self.cursor.pending_wrap = false;
        self.advance_line();
    }

    fn advance_line(&mut self) {
        if self.cursor.y + 1 < self.height {
            self.cursor.y += 1;
            return;
        }
        if let Some(top) = self.grid.pop_front() {
            self.scrollback.push(top.freeze());
        }
        let line = self.blank_line();
        self.grid.push_back(line);
    }

    fn blank_line(&mut self) -> LineBuf {
        let mut line = LineBuf::with_width(self.width);
        line.set_metadata(LineMetadata {
            generation: self.next_generation,
            timestamp: self.now,
            rtl_found: false,
        });
        self.next_generation += 1;
        line
    }

    /// Run an edit on row `y` and stamp the line with the current time.
    ///
    /// Edits issued by the screen are in bounds by construction.
    pub(crate) fn with_line(&mut self, y: usize, edit: impl FnOnce(&mut LineBuf) -> Result<()>) {
        let now = self.now;
        let Some(line) = self.grid.get_mut(y) else {
            debug_assert!(false, "row {y} outside grid");
            return;
        };
        if let Err(e) = edit(line) {
            debug_assert!(false, "screen edit failed: {e}");
            return;
        }
        let mut metadata = *line.metadata_ref();
        metadata.timestamp = now;
        line.set_metadata(metadata);
    }

    /// Immutable copy of the whole screen for readers.
    pub fn snapshot(&self) -> ScreenSnapshot {
        ScreenSnapshot::new(
            self.width,
            self.height,
            self.grid.iter().map(LineBuf::freeze).collect(),
            self.scrollback.clone(),
            self.cursor,
        )
    }

    /// Grid rows as text, one row per line, `.` for empty cells.
    pub fn compact_dump(&self) -> String {
        compact_dump(self.grid.iter().map(|l| l as &dyn CellString))
    }

    /// Scrollback rows followed by grid rows, `.` for empty cells.
    pub fn compact_dump_with_history(&self) -> String {
        compact_dump(
            self.scrollback
                .iter()
                .map(|l| l as &dyn CellString)
                .chain(self.grid.iter().map(|l| l as &dyn CellString)),
        )
    }
}

/// Render rows as text: `.` for empty cells, skip cells omitted, one row per
/// line.
pub fn compact_dump<'a>(rows: impl IntoIterator<Item = &'a dyn CellString>) -> String {
    rows.into_iter()
        .map(|row| {
            let mut out = String::with_capacity(row.cell_count());
            let mut cells = Vec::with_capacity(row.cell_count());
            row.copy_cells(row.full_range(), &mut cells);
            for cell in &cells {
                if cell.is_wide_continuation() {
                    continue;
                }
                match cell.grapheme() {
                    Some(g) => g.push_to(&mut out),
                    None => out.push('.'),
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Used length of a screen line.
///
/// A soft-wrapped line counts every cell, a line that wrapped early for a
/// double-width character counts all but its last cell, and a hard line
/// counts up to its last content cell.
pub fn line_used_length(line: &dyn CellString) -> usize {
    match line.eol() {
        Eol::Soft => line.cell_count(),
        Eol::Dwc => line.cell_count().saturating_sub(1),
        Eol::Hard => line.used_length(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{Color, Hyperlink};
    use pretty_assertions::assert_eq;

    fn screen(width: usize, height: usize) -> Screen {
        Screen::new(width, height, 100).unwrap()
    }

    #[test]
    fn test_rejects_tiny_screen() {
        assert!(Screen::new(1, 5, 0).is_err());
        assert!(Screen::new(5, 0, 0).is_err());
    }

    #[test]
    fn test_plain_text_and_crlf() {
        let mut s = screen(5, 3);
        s.append_string_at_cursor("ab\r\ncd");
        assert_eq!(s.compact_dump(), "ab...\ncd...\n.....");
        assert_eq!(s.cursor(), Cursor { x: 2, y: 1, pending_wrap: false });
    }

    #[test]
    fn test_soft_wrap_is_deferred() {
        let mut s = screen(5, 3);
        s.append_string_at_cursor("abcde");
        assert_eq!(s.cursor(), Cursor { x: 4, y: 0, pending_wrap: true });
        assert_eq!(s.line(0).unwrap().eol(), Eol::Hard);
        s.append_string_at_cursor("fgh");
        assert_eq!(s.compact_dump(), "abcde\nfgh..\n.....");
        assert_eq!(s.line(0).unwrap().eol(), Eol::Soft);
        assert_eq!(line_used_length(s.line(0).unwrap()), 5);
    }

    #[test]
    fn test_carriage_return_cancels_pending_wrap() {
        let mut s = screen(3, 2);
        s.append_string_at_cursor("abc\rX");
        assert_eq!(s.compact_dump(), "Xbc\n...");
        assert_eq!(s.line(0).unwrap().eol(), Eol::Hard);
    }

    #[test]
    fn test_wide_char_in_last_column_wraps_early() {
        let mut s = screen(4, 2);
        s.append_string_at_cursor("abc日");
        assert_eq!(s.compact_dump(), "abc.\n日..");
        assert_eq!(s.line(0).unwrap().eol(), Eol::Dwc);
        assert_eq!(line_used_length(s.line(0).unwrap()), 3);
        assert_eq!(s.cursor().x, 2);
    }

    #[test]
    fn test_overwriting_wide_char_half() {
        let mut s = screen(6, 1);
        s.append_string_at_cursor("日本");
        s.move_cursor(1, 0);
        s.append_string_at_cursor("x");
        assert_eq!(s.compact_dump(), ".x本..");
        s.move_cursor(2, 0);
        s.append_string_at_cursor("y");
        assert_eq!(s.compact_dump(), ".xy...");
    }

    #[test]
    fn test_scrolls_into_history() {
        let mut s = Screen::new(4, 2, 10).unwrap();
        s.append_string_at_cursor("a\r\nb\r\nc\r\nd");
        assert_eq!(s.scrollback().len(), 2);
        assert_eq!(s.compact_dump_with_history(), "a...\nb...\nc...\nd...");
        // Generations are assigned in creation order.
        let gens: Vec<u64> = s
            .scrollback()
            .iter()
            .map(|l| l.metadata().generation)
            .chain(s.lines().map(|l| l.metadata().generation))
            .collect();
        assert_eq!(gens, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_pen_is_applied() {
        let mut s = screen(4, 1);
        let link = ExternalAttribute::with_hyperlink(Hyperlink::new("https://a"));
        s.apply(&Token::SetPen(Cell::EMPTY.with_fg(Color::Indexed(1))));
        s.apply(&Token::SetPenAttribute(Some(link.clone())));
        s.apply(&Token::text("ab"));
        s.apply(&Token::SetPenAttribute(None));
        s.apply(&Token::text("c"));
        let line = s.line(0).unwrap();
        assert_eq!(line.character(0).unwrap().fg(), Color::Indexed(1));
        assert_eq!(line.external_attribute(1), Some(link));
        assert_eq!(line.external_attribute(2), None);
    }

    #[test]
    fn test_timestamps_follow_writes() {
        let mut s = screen(4, 2);
        s.set_time(7.0);
        s.append_string_at_cursor("a");
        assert_eq!(s.line(0).unwrap().metadata().timestamp, 7.0);
        assert_eq!(s.line(1).unwrap().metadata().timestamp, 0.0);
    }

    #[test]
    fn test_combining_marks_share_a_cell() {
        let mut s = screen(4, 1);
        s.append_string_at_cursor("e\u{301}x");
        assert_eq!(s.compact_dump(), "e\u{301}x..");
    }
}
