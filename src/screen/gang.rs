//! Bulk ingestion of pre-scanned ASCII.
//!
//! Each printable run is written with one [`LineBuf::write_ascii`] per row
//! it covers and each break is one cursor update, instead of one cell write
//! and cursor update per byte. The result matches the general path exactly,
//! including the double-width repairs at the edges of each write.
//!
//! [`LineBuf::write_ascii`]: crate::buffer::LineBuf::write_ascii

use super::token::{GangToken, Segment};
use super::Screen;
use crate::buffer::Eol;
use tracing::debug;

impl Screen {
    /// Append a batch of gang tokens.
    pub fn append_mixed_ascii_gang(&mut self, tokens: &[GangToken]) {
        let bytes: usize = tokens.iter().map(|t| t.bytes().len()).sum();
        let breaks: usize = tokens.iter().map(|t| t.breaks().len()).sum();
        debug!(tokens = tokens.len(), bytes, breaks, "gang batch");

        for token in tokens {
            for segment in token.segments() {
                match segment {
                    Segment::Text(run) => self.write_ascii_run(run),
                    Segment::CarriageReturn => self.carriage_return(),
                    Segment::LineFeed => self.line_feed(),
                }
            }
        }
    }

    fn write_ascii_run(&mut self, mut run: &[u8]) {
        while !run.is_empty() {
            if self.cursor.pending_wrap {
                self.wrap(Eol::Soft);
            }
            let x = self.cursor.x;
            let y = self.cursor.y;
            let n = run.len().min(self.width - x);
            let (head, tail) = run.split_at(n);
            let template = self.pen.cell;
            let attribute = self.pen.attribute.clone();
            self.with_line(y, |line| {
                line.write_ascii(x, head, template, attribute.as_ref())
            });
            self.advance_cursor(n);
            run = tail;
        }
    }
}
