//! Decoded input tokens consumed by the screen.

use crate::buffer::{Cell, ExternalAttribute};
use crate::error::{BufferError, Result};

/// A run of printable ASCII with the offsets of its line breaks.
///
/// `breaks` lists, in ascending order, the offset of every CR (`\r`) and LF
/// (`\n`) byte in `bytes`; a CRLF pair contributes two offsets. Every other
/// byte is printable ASCII.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GangToken {
    bytes: Vec<u8>,
    breaks: Vec<usize>,
}

const fn is_break(b: u8) -> bool {
    b == b'\r' || b == b'\n'
}

const fn is_printable(b: u8) -> bool {
    matches!(b, 0x20..=0x7e)
}

impl GangToken {
    /// Build a token by scanning `bytes` for CR and LF.
    pub fn from_ascii(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        let mut breaks = Vec::new();
        for (i, &b) in bytes.iter().enumerate() {
            if is_break(b) {
                breaks.push(i);
            } else if !is_printable(b) {
                return Err(BufferError::invalid(format!(
                    "byte {b:#04x} at {i} is not printable ASCII"
                )));
            }
        }
        Ok(Self { bytes, breaks })
    }

    /// Build a token from bytes and a precomputed break list.
    ///
    /// The list must be ascending, in bounds, point only at CR or LF, and
    /// cover every CR and LF in `bytes`.
    pub fn new(bytes: impl Into<Vec<u8>>, breaks: Vec<usize>) -> Result<Self> {
        let bytes = bytes.into();
        if breaks.windows(2).any(|w| w[0] >= w[1]) {
            return Err(BufferError::invalid("break offsets must be strictly ascending"));
        }
        if let Some(&last) = breaks.last() {
            if last >= bytes.len() {
                return Err(BufferError::invalid(format!(
                    "break offset {last} past {} bytes",
                    bytes.len()
                )));
            }
        }
        let mut expected = breaks.iter().copied().peekable();
        for (i, &b) in bytes.iter().enumerate() {
            let listed = expected.next_if_eq(&i).is_some();
            match (is_break(b), listed) {
                (true, true) => {}
                (false, true) => {
                    return Err(BufferError::invalid(format!(
                        "break offset {i} does not point at CR or LF"
                    )));
                }
                (true, false) => {
                    return Err(BufferError::invalid(format!(
                        "line break at {i} missing from break list"
                    )));
                }
                (false, false) if !is_printable(b) => {
                    return Err(BufferError::invalid(format!(
                        "byte {b:#04x} at {i} is not printable ASCII"
                    )));
                }
                (false, false) => {}
            }
        }
        Ok(Self { bytes, breaks })
    }

    /// The raw bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Offsets of CR and LF bytes.
    pub fn breaks(&self) -> &[usize] {
        &self.breaks
    }

    /// Iterate over the token as printable runs separated by breaks.
    pub(crate) fn segments(&self) -> impl Iterator<Item = Segment<'_>> {
        let mut start = 0;
        let mut breaks = self.breaks.iter();
        let mut pending_break = None;
        std::iter::from_fn(move || {
            if let Some(b) = pending_break.take() {
                return Some(b);
            }
            if start > self.bytes.len() {
                return None;
            }
            if let Some(&at) = breaks.next() {
                let run = &self.bytes[start..at];
                start = at + 1;
                pending_break = Some(if self.bytes[at] == b'\r' {
                    Segment::CarriageReturn
                } else {
                    Segment::LineFeed
                });
                Some(Segment::Text(run))
            } else {
                let run = &self.bytes[start..];
                start = self.bytes.len() + 1;
                Some(Segment::Text(run))
            }
        })
    }
}

/// One piece of a [`GangToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a [u8]),
    CarriageReturn,
    LineFeed,
}

/// A decoded input token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Text to print at the cursor.
    Text {
        /// The text; CR and LF inside it are honored.
        text: String,
    },
    /// Move the cursor to column 0.
    CarriageReturn,
    /// Move the cursor down, scrolling at the bottom.
    LineFeed,
    /// Carriage return followed by line feed.
    CarriageReturnLineFeed,
    /// Replace the pen's colors and style.
    SetPen(Cell),
    /// Replace (or clear) the extended attributes applied to new text.
    SetPenAttribute(Option<ExternalAttribute>),
    /// A batch of pre-scanned ASCII runs for the bulk path.
    Gang(Vec<GangToken>),
}

impl Token {
    /// Convenience constructor for [`Token::Text`].
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}
