//! Cell: The atomic unit of terminal content.
//!
//! # Memory Layout
//!
//! The `Cell` struct is laid out for cache efficiency and a trivial wire form:
//! - 16 bytes total, allowing 4 cells per cache line (64 bytes)
//! - Single scalars are stored inline as their code point
//! - Multi-scalar grapheme clusters are interned in the [`complex`](super::complex)
//!   registry and the cell stores the registry key instead
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Cell Layout (16 bytes)                                           │
//! ├─────────────┬───────────┬───────────┬─────────┬───────┬───────────┤
//! │    code     │    fg     │    bg     │  style  │ flags │    rtl    │
//! │    u32      │  tag+rgb  │  tag+rgb  │   u16   │  u8   │    u8     │
//! │  4 bytes    │  4 bytes  │  4 bytes  │ 2 bytes │  1 b  │   1 b     │
//! └─────────────┴───────────┴───────────┴─────────┴───────┴───────────┘
//! ```
//!
//! A double-width character occupies two slots: the left one carries the
//! glyph and the [`CellFlags::WIDE`] flag, the right one is a *skip* cell
//! ([`CellFlags::WIDE_CONTINUATION`]) that is never rendered or counted as
//! content.

use super::complex;
use crate::error::{BufferError, Result};
use bitflags::bitflags;
use std::sync::Arc;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Size in bytes of one encoded cell.
pub const CELL_WIRE_SIZE: usize = 16;

/// True-color RGB representation.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create from a 24-bit hex color (e.g., 0xFF5500).
    #[inline]
    pub const fn from_u32(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }
}

impl std::fmt::Debug for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<(u8, u8, u8)> for Rgb {
    #[inline]
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self::new(r, g, b)
    }
}

/// A foreground or background color.
///
/// Four bytes: a one-byte mode tag followed by up to three bytes of payload.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash, Debug)]
pub enum Color {
    /// The terminal's default color for this slot.
    #[default]
    Default = 0,
    /// One of the 256 palette entries.
    Indexed(u8) = 1,
    /// 24-bit color.
    Rgb(Rgb) = 2,
}

impl Color {
    #[inline]
    pub(crate) const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Default => [0, 0, 0, 0],
            Self::Indexed(i) => [1, i, 0, 0],
            Self::Rgb(Rgb { r, g, b }) => [2, r, g, b],
        }
    }

    pub(crate) fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        match bytes {
            [0, 0, 0, 0] => Ok(Self::Default),
            [1, i, 0, 0] => Ok(Self::Indexed(i)),
            [2, r, g, b] => Ok(Self::Rgb(Rgb::new(r, g, b))),
            _ => Err(BufferError::malformed(format!("bad color {bytes:?}"))),
        }
    }
}

bitflags! {
    /// Text style bits.
    ///
    /// These can be combined using bitwise OR.
    ///
    /// # Example
    /// ```
    /// use scrollcell::Style;
    /// let style = Style::BOLD | Style::ITALIC;
    /// assert!(style.contains(Style::BOLD));
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Style: u16 {
        /// Bold text
        const BOLD = 1 << 0;
        /// Dim/faint text
        const FAINT = 1 << 1;
        /// Italic text
        const ITALIC = 1 << 2;
        /// Underlined text
        const UNDERLINE = 1 << 3;
        /// Blinking text
        const BLINK = 1 << 4;
        /// Reversed colors (fg/bg swapped)
        const INVERSE = 1 << 5;
        /// Hidden/invisible text
        const INVISIBLE = 1 << 6;
        /// Strikethrough text
        const STRIKETHROUGH = 1 << 7;
        /// Protected from selective erase
        const GUARDED = 1 << 8;
    }
}

impl std::fmt::Debug for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

bitflags! {
    /// Cell-level flags describing how the code is stored and how wide it is.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CellFlags: u8 {
        /// Left half of a double-width character.
        const WIDE = 0b0000_0001;
        /// Right half of a double-width character (a "skip" cell).
        const WIDE_CONTINUATION = 0b0000_0010;
        /// `code` is a key into the complex character registry.
        const COMPLEX = 0b0000_0100;
    }
}

impl std::fmt::Debug for CellFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// Bidirectional status of a cell, filled in by a separate bidi pass.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub enum RtlStatus {
    /// Not analyzed yet.
    #[default]
    Unknown = 0,
    /// Left to right.
    Ltr = 1,
    /// Right to left.
    Rtl = 2,
}

impl RtlStatus {
    const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Unknown),
            1 => Some(Self::Ltr),
            2 => Some(Self::Rtl),
            _ => None,
        }
    }
}

/// How a line ends.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub enum Eol {
    /// Explicit line break (or no wrap yet).
    #[default]
    Hard = 0,
    /// Text continued onto the next line.
    Soft = 1,
    /// Wrapped early because a double-width character did not fit in the
    /// last column, which is left empty.
    Dwc = 2,
}

impl Eol {
    /// Decode from a continuation cell's code.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Hard),
            1 => Some(Self::Soft),
            2 => Some(Self::Dwc),
            _ => None,
        }
    }
}

/// A single terminal cell.
///
/// `code == 0` (without [`CellFlags::COMPLEX`]) is an empty slot. Anything
/// else is content, except skip cells which carry code 0 and the
/// [`CellFlags::WIDE_CONTINUATION`] flag.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    /// Unicode scalar, complex registry key, or 0.
    code: u32,
    /// Foreground color.
    fg: Color,
    /// Background color.
    bg: Color,
    /// Text style.
    style: Style,
    /// Width and storage flags.
    flags: CellFlags,
    /// Bidi status.
    rtl: RtlStatus,
}

const _: () = assert!(
    std::mem::size_of::<Cell>() == CELL_WIRE_SIZE,
    "Cell must be exactly 16 bytes"
);

impl Cell {
    /// An empty cell with default colors.
    pub const EMPTY: Self = Self {
        code: 0,
        fg: Color::Default,
        bg: Color::Default,
        style: Style::empty(),
        flags: CellFlags::empty(),
        rtl: RtlStatus::Unknown,
    };

    /// Create a cell holding one ASCII byte.
    #[inline]
    pub const fn ascii(byte: u8) -> Self {
        Self::EMPTY.with_ascii(byte)
    }

    /// Create a cell from any character.
    ///
    /// Double-width characters get the [`CellFlags::WIDE`] flag; the caller
    /// places the matching [`Cell::wide_continuation`] after it.
    pub fn from_char(c: char) -> Self {
        let mut cell = Self {
            code: u32::from(c),
            ..Self::EMPTY
        };
        if UnicodeWidthChar::width(c) == Some(2) {
            cell.flags = CellFlags::WIDE;
        }
        cell
    }

    /// Create a cell from a grapheme cluster.
    ///
    /// Clusters made of more than one scalar are interned in the complex
    /// character registry.
    pub fn from_grapheme(grapheme: &str) -> Self {
        Self::EMPTY.with_grapheme(grapheme)
    }

    /// The right half of a double-width character.
    #[inline]
    pub const fn wide_continuation() -> Self {
        Self {
            flags: CellFlags::WIDE_CONTINUATION,
            ..Self::EMPTY
        }
    }

    /// The continuation cell recording how a line ends.
    #[inline]
    pub const fn continuation(eol: Eol) -> Self {
        Self {
            code: eol as u32,
            ..Self::EMPTY
        }
    }

    /// Copy of this cell's colors and style holding `byte`.
    #[inline]
    #[must_use]
    pub const fn with_ascii(self, byte: u8) -> Self {
        Self {
            code: byte as u32,
            flags: CellFlags::empty(),
            rtl: RtlStatus::Unknown,
            ..self
        }
    }

    /// Copy of this cell's colors and style holding `grapheme`.
    #[must_use]
    pub fn with_grapheme(self, grapheme: &str) -> Self {
        let mut chars = grapheme.chars();
        let (code, mut flags) = match (chars.next(), chars.next()) {
            (None, _) => (0, CellFlags::empty()),
            (Some(c), None) => (u32::from(c), CellFlags::empty()),
            (Some(_), Some(_)) => (complex::intern(grapheme), CellFlags::COMPLEX),
        };
        if UnicodeWidthStr::width(grapheme) >= 2 {
            flags |= CellFlags::WIDE;
        }
        Self {
            code,
            flags,
            rtl: RtlStatus::Unknown,
            ..self
        }
    }

    /// A skip cell carrying this cell's colors and style.
    #[inline]
    #[must_use]
    pub const fn continuation_of(self) -> Self {
        Self {
            code: 0,
            flags: CellFlags::WIDE_CONTINUATION,
            rtl: RtlStatus::Unknown,
            ..self
        }
    }

    /// This cell with its content removed but colors and style kept.
    #[inline]
    #[must_use]
    pub const fn erased(self) -> Self {
        Self {
            code: 0,
            flags: CellFlags::empty(),
            ..self
        }
    }

    /// Raw code (scalar, registry key or 0).
    #[inline]
    pub const fn code(&self) -> u32 {
        self.code
    }

    /// True for a slot with no content. Skip cells are not null.
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.code == 0 && self.flags.is_empty()
    }

    /// True if this cell counts as content for used-length purposes.
    #[inline]
    pub const fn has_content(&self) -> bool {
        (self.code != 0 || self.flags.contains(CellFlags::COMPLEX))
            && !self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// Check if this is the left half of a double-width character.
    #[inline]
    pub const fn is_wide(&self) -> bool {
        self.flags.contains(CellFlags::WIDE)
    }

    /// Check if this is a wide-character continuation (skip cell).
    #[inline]
    pub const fn is_wide_continuation(&self) -> bool {
        self.flags.contains(CellFlags::WIDE_CONTINUATION)
    }

    /// Check if the code is a complex registry key.
    #[inline]
    pub const fn is_complex(&self) -> bool {
        self.flags.contains(CellFlags::COMPLEX)
    }

    /// Display width (0 for skip cells, 2 for wide, else 1).
    #[inline]
    pub const fn display_width(&self) -> u8 {
        if self.is_wide_continuation() {
            0
        } else if self.is_wide() {
            2
        } else {
            1
        }
    }

    /// Get the foreground color.
    #[inline]
    pub const fn fg(&self) -> Color {
        self.fg
    }

    /// Get the background color.
    #[inline]
    pub const fn bg(&self) -> Color {
        self.bg
    }

    /// Get the style.
    #[inline]
    pub const fn style(&self) -> Style {
        self.style
    }

    /// Get the flags.
    #[inline]
    pub const fn flags(&self) -> CellFlags {
        self.flags
    }

    /// Get the bidi status.
    #[inline]
    pub const fn rtl_status(&self) -> RtlStatus {
        self.rtl
    }

    /// Set the bidi status.
    #[inline]
    pub const fn set_rtl_status(&mut self, rtl: RtlStatus) -> &mut Self {
        self.rtl = rtl;
        self
    }

    /// Set the foreground color (builder pattern).
    #[inline]
    #[must_use]
    pub const fn with_fg(mut self, fg: Color) -> Self {
        self.fg = fg;
        self
    }

    /// Set the background color (builder pattern).
    #[inline]
    #[must_use]
    pub const fn with_bg(mut self, bg: Color) -> Self {
        self.bg = bg;
        self
    }

    /// Set the style (builder pattern).
    #[inline]
    #[must_use]
    pub const fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// The cell's text, if it has any.
    ///
    /// Returns `None` for empty and skip cells.
    pub fn grapheme(&self) -> Option<Grapheme> {
        if !self.has_content() {
            return None;
        }
        if self.is_complex() {
            return complex::lookup(self.code).map(Grapheme::Complex);
        }
        char::from_u32(self.code).map(Grapheme::Char)
    }

    /// Encode as 16 little-endian bytes.
    pub fn to_bytes(&self) -> [u8; CELL_WIRE_SIZE] {
        let mut out = [0u8; CELL_WIRE_SIZE];
        out[0..4].copy_from_slice(&self.code.to_le_bytes());
        out[4..8].copy_from_slice(&self.fg.to_bytes());
        out[8..12].copy_from_slice(&self.bg.to_bytes());
        out[12..14].copy_from_slice(&self.style.bits().to_le_bytes());
        out[14] = self.flags.bits();
        out[15] = self.rtl as u8;
        out
    }

    /// Decode from 16 bytes produced by [`Cell::to_bytes`].
    pub fn from_bytes(bytes: &[u8; CELL_WIRE_SIZE]) -> Result<Self> {
        let code = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let fg = Color::from_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])?;
        let bg = Color::from_bytes([bytes[8], bytes[9], bytes[10], bytes[11]])?;
        let style = Style::from_bits(u16::from_le_bytes([bytes[12], bytes[13]]))
            .ok_or_else(|| BufferError::malformed("unknown style bits"))?;
        let flags = CellFlags::from_bits(bytes[14])
            .ok_or_else(|| BufferError::malformed("unknown cell flags"))?;
        let rtl = RtlStatus::from_u8(bytes[15])
            .ok_or_else(|| BufferError::malformed("bad rtl status"))?;
        Ok(Self {
            code,
            fg,
            bg,
            style,
            flags,
            rtl,
        })
    }

    /// Same cell with a different raw code. Used when remapping complex keys.
    pub(crate) const fn with_code(mut self, code: u32) -> Self {
        self.code = code;
        self
    }
}

/// Text held by a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grapheme {
    /// A single scalar.
    Char(char),
    /// A multi-scalar cluster from the complex registry.
    Complex(Arc<str>),
}

impl Grapheme {
    /// Append to a string.
    pub fn push_to(&self, out: &mut String) {
        match self {
            Self::Char(c) => out.push(*c),
            Self::Complex(s) => out.push_str(s),
        }
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut text = String::new();
        if let Some(g) = self.grapheme() {
            g.push_to(&mut text);
        }
        f.debug_struct("Cell")
            .field("text", &text)
            .field("code", &self.code)
            .field("fg", &self.fg)
            .field("bg", &self.bg)
            .field("style", &self.style)
            .field("flags", &self.flags)
            .field("rtl", &self.rtl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_size() {
        assert_eq!(std::mem::size_of::<Cell>(), 16);
        assert_eq!(std::mem::size_of::<Color>(), 4);
    }

    #[test]
    fn test_rgb_from_hex() {
        let rgb = Rgb::from_u32(0xFF8000);
        assert_eq!(rgb, Rgb::new(255, 128, 0));
    }

    #[test]
    fn test_cell_ascii() {
        let cell = Cell::ascii(b'A');
        assert_eq!(cell.grapheme(), Some(Grapheme::Char('A')));
        assert_eq!(cell.display_width(), 1);
        assert!(cell.has_content());
    }

    #[test]
    fn test_cell_from_char_wide() {
        let cell = Cell::from_char('日');
        assert!(cell.is_wide());
        assert_eq!(cell.display_width(), 2);
    }

    #[test]
    fn test_cell_from_grapheme_complex() {
        let cell = Cell::from_grapheme("e\u{301}");
        assert!(cell.is_complex());
        assert_eq!(
            cell.grapheme(),
            Some(Grapheme::Complex(Arc::from("e\u{301}")))
        );
        // Interning is stable.
        assert_eq!(cell, Cell::from_grapheme("e\u{301}"));
    }

    #[test]
    fn test_empty_and_skip_are_not_content() {
        assert!(!Cell::EMPTY.has_content());
        assert!(Cell::EMPTY.is_null());
        let skip = Cell::wide_continuation();
        assert!(!skip.has_content());
        assert!(!skip.is_null());
        assert_eq!(skip.display_width(), 0);
    }

    #[test]
    fn test_with_ascii_keeps_pen() {
        let pen = Cell::EMPTY
            .with_fg(Color::Indexed(3))
            .with_bg(Color::Rgb(Rgb::new(1, 2, 3)))
            .with_style(Style::BOLD | Style::UNDERLINE);
        let cell = pen.with_ascii(b'x');
        assert_eq!(cell.fg(), Color::Indexed(3));
        assert_eq!(cell.bg(), Color::Rgb(Rgb::new(1, 2, 3)));
        assert!(cell.style().contains(Style::BOLD));
        assert_eq!(cell.code(), u32::from(b'x'));
    }

    #[test]
    fn test_bytes_round_trip() {
        let mut cell = Cell::from_char('é')
            .with_fg(Color::Rgb(Rgb::new(9, 8, 7)))
            .with_style(Style::ITALIC | Style::GUARDED);
        cell.set_rtl_status(RtlStatus::Rtl);
        assert_eq!(Cell::from_bytes(&cell.to_bytes()), Ok(cell));
    }

    #[test]
    fn test_bytes_rejects_garbage() {
        let mut bytes = Cell::ascii(b'a').to_bytes();
        bytes[15] = 7;
        assert!(matches!(
            Cell::from_bytes(&bytes),
            Err(BufferError::MalformedData(_))
        ));

        let mut bytes = Cell::ascii(b'a').to_bytes();
        bytes[4] = 9;
        assert!(Cell::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_continuation_eol() {
        let c = Cell::continuation(Eol::Soft);
        assert_eq!(Eol::from_code(c.code()), Some(Eol::Soft));
        assert_eq!(Eol::from_code(9), None);
    }
}
