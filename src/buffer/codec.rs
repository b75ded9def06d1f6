//! Tag-length-value wire format for a line.
//!
//! ```text
//! record := tag: u8 | length: u32 LE | value: [u8; length]
//! ```
//!
//! | Tag | Name           | Value                                           | Required |
//! |-----|----------------|-------------------------------------------------|----------|
//! | 1   | `Line`         | cells, 16 bytes each                            | yes      |
//! | 2   | `Overlay`      | `count: u32`, then `index: u32` + attribute     | no       |
//! | 3   | `Metadata`     | `generation: u64`, `timestamp: f64`, `rtl: u8`  | yes      |
//! | 4   | `Continuation` | one cell                                        | yes      |
//! | 5   | `ComplexChars` | `count: u32`, then `key: u32` + string          | no       |
//!
//! Strings are `len: u32` followed by UTF-8 bytes. An attribute starts with a
//! presence byte (bit 0 underline color, bit 1 hyperlink, bit 2 block id,
//! bit 3 control code) followed by the present fields in that order.
//!
//! Complex cells carry process-local registry keys, so the encoder ships the
//! strings behind them and the decoder re-interns them and rewrites the keys.
//!
//! Decoding is all-or-nothing: any defect yields
//! [`BufferError::MalformedData`] and no buffer.

use super::cell::{Cell, Color, Eol, CELL_WIRE_SIZE};
use super::complex;
use super::line_buf::LineBuf;
use super::overlay::{ExternalAttribute, ExternalAttributes, Hyperlink};
use super::string::{CellString, LineMetadata};
use crate::error::{check_range, BufferError, Result};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;
use tracing::warn;

/// Record tags.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    /// Raw cell array.
    Line = 1,
    /// Sparse attribute overlay.
    Overlay = 2,
    /// Line metadata.
    Metadata = 3,
    /// Continuation cell.
    Continuation = 4,
    /// Complex character strings.
    ComplexChars = 5,
}

impl Tag {
    const fn from_u8(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Line),
            2 => Some(Self::Overlay),
            3 => Some(Self::Metadata),
            4 => Some(Self::Continuation),
            5 => Some(Self::ComplexChars),
            _ => None,
        }
    }
}

const METADATA_LEN: usize = 8 + 8 + 1;

const HAS_UNDERLINE: u8 = 1 << 0;
const HAS_HYPERLINK: u8 = 1 << 1;
const HAS_BLOCK_ID: u8 = 1 << 2;
const HAS_CONTROL: u8 = 1 << 3;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `source[range]` as a TLV stream.
pub fn encode<S: CellString + ?Sized>(source: &S, range: Range<usize>) -> Result<Vec<u8>> {
    check_range(&range, source.cell_count())?;
    let mut cells = Vec::with_capacity(range.len());
    source.copy_cells(range.clone(), &mut cells);
    let overlay = source.attributes_in(range);

    let mut out = Vec::with_capacity(cells.len() * CELL_WIRE_SIZE + 64);

    let mut value = Vec::with_capacity(cells.len() * CELL_WIRE_SIZE);
    for cell in &cells {
        value.extend_from_slice(&cell.to_bytes());
    }
    put_record(&mut out, Tag::Line, &value)?;

    if !overlay.is_empty() {
        value.clear();
        put_u32(&mut value, overlay.len())?;
        for (index, attr) in overlay.iter() {
            put_u32(&mut value, index)?;
            put_attribute(&mut value, attr)?;
        }
        put_record(&mut out, Tag::Overlay, &value)?;
    }

    let metadata = source.metadata();
    value.clear();
    value.extend_from_slice(&metadata.generation.to_le_bytes());
    value.extend_from_slice(&metadata.timestamp.to_bits().to_le_bytes());
    value.push(u8::from(metadata.rtl_found));
    put_record(&mut out, Tag::Metadata, &value)?;

    put_record(&mut out, Tag::Continuation, &source.continuation().to_bytes())?;

    let complex: BTreeMap<u32, Arc<str>> = cells
        .iter()
        .filter(|c| c.is_complex())
        .filter_map(|c| complex::lookup(c.code()).map(|s| (c.code(), s)))
        .collect();
    if !complex.is_empty() {
        value.clear();
        put_u32(&mut value, complex.len())?;
        for (key, text) in &complex {
            value.extend_from_slice(&key.to_le_bytes());
            put_str(&mut value, text)?;
        }
        put_record(&mut out, Tag::ComplexChars, &value)?;
    }

    Ok(out)
}

fn put_record(out: &mut Vec<u8>, tag: Tag, value: &[u8]) -> Result<()> {
    out.push(tag as u8);
    put_u32(out, value.len())?;
    out.extend_from_slice(value);
    Ok(())
}

fn put_u32(out: &mut Vec<u8>, v: usize) -> Result<()> {
    let v = u32::try_from(v).map_err(|_| BufferError::invalid("length exceeds u32"))?;
    out.extend_from_slice(&v.to_le_bytes());
    Ok(())
}

fn put_str(out: &mut Vec<u8>, s: &str) -> Result<()> {
    put_u32(out, s.len())?;
    out.extend_from_slice(s.as_bytes());
    Ok(())
}

fn put_attribute(out: &mut Vec<u8>, attr: &ExternalAttribute) -> Result<()> {
    let mut mask = 0u8;
    if attr.underline_color.is_some() {
        mask |= HAS_UNDERLINE;
    }
    if attr.hyperlink.is_some() {
        mask |= HAS_HYPERLINK;
    }
    if attr.block_id.is_some() {
        mask |= HAS_BLOCK_ID;
    }
    if attr.control_code.is_some() {
        mask |= HAS_CONTROL;
    }
    out.push(mask);
    if let Some(color) = attr.underline_color {
        out.extend_from_slice(&color.to_bytes());
    }
    if let Some(link) = &attr.hyperlink {
        put_str(out, &link.url)?;
        match &link.id {
            Some(id) => {
                out.push(1);
                put_str(out, id)?;
            }
            None => out.push(0),
        }
    }
    if let Some(block) = &attr.block_id {
        put_str(out, block)?;
    }
    if let Some(code) = attr.control_code {
        out.extend_from_slice(&code.to_le_bytes());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over a byte slice.
struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.bytes.len() {
            return Err(BufferError::malformed(format!(
                "truncated: wanted {n} bytes, {} left",
                self.bytes.len()
            )));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn len(&mut self) -> Result<usize> {
        usize::try_from(self.u32()?).map_err(|_| BufferError::malformed("length overflow"))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.len()?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| BufferError::malformed("invalid UTF-8"))
    }

    fn finish(&self, what: &str) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(BufferError::malformed(format!(
                "{} trailing bytes in {what}",
                self.bytes.len()
            )))
        }
    }
}

#[derive(Default)]
struct Records<'a> {
    line: Option<&'a [u8]>,
    overlay: Option<&'a [u8]>,
    metadata: Option<&'a [u8]>,
    continuation: Option<&'a [u8]>,
    complex: Option<&'a [u8]>,
}

impl<'a> Records<'a> {
    fn split(bytes: &'a [u8]) -> Result<Self> {
        let mut records = Self::default();
        let mut reader = Reader::new(bytes);
        while !reader.is_empty() {
            let raw = reader.u8()?;
            let tag = Tag::from_u8(raw)
                .ok_or_else(|| BufferError::malformed(format!("unknown tag {raw}")))?;
            let len = reader.len()?;
            let value = reader.take(len)?;
            let slot = match tag {
                Tag::Line => &mut records.line,
                Tag::Overlay => &mut records.overlay,
                Tag::Metadata => &mut records.metadata,
                Tag::Continuation => &mut records.continuation,
                Tag::ComplexChars => &mut records.complex,
            };
            if slot.replace(value).is_some() {
                return Err(BufferError::malformed(format!("duplicate tag {tag:?}")));
            }
        }
        Ok(records)
    }
}

/// Decode a TLV stream produced by [`encode`] into a new line.
///
/// The result is cell-for-cell what was encoded. A range that cut a
/// double-width pair comes back with the orphaned half still in place; the
/// next edit touching that seam erases it.
///
/// Complex characters are interned only after the whole stream validated,
/// so a rejected stream leaves the registry untouched.
pub fn decode_line(bytes: &[u8]) -> Result<LineBuf> {
    decode_inner(bytes).inspect_err(|e| warn!(error = %e, len = bytes.len(), "rejected encoded line"))
}

fn decode_inner(bytes: &[u8]) -> Result<LineBuf> {
    let records = Records::split(bytes)?;
    let line = records
        .line
        .ok_or_else(|| BufferError::malformed("missing Line record"))?;
    let metadata = records
        .metadata
        .ok_or_else(|| BufferError::malformed("missing Metadata record"))?;
    let continuation = records
        .continuation
        .ok_or_else(|| BufferError::malformed("missing Continuation record"))?;

    let table = records.complex.map(decode_complex).transpose()?.unwrap_or_default();
    let mut cells = decode_cells(line, &table)?;
    let overlay = records
        .overlay
        .map(|v| decode_overlay(v, cells.len()))
        .transpose()?
        .unwrap_or_default();
    let metadata = decode_metadata(metadata)?;
    let continuation = decode_continuation(continuation)?;

    // The stream is valid; only now touch the process-wide registry.
    let remap: BTreeMap<u32, u32> = table
        .iter()
        .map(|(&key, text)| (key, complex::intern(text)))
        .collect();
    for cell in cells.iter_mut().filter(|c| c.is_complex()) {
        if let Some(&key) = remap.get(&cell.code()) {
            *cell = cell.with_code(key);
        }
    }

    Ok(LineBuf::from_parts(cells, overlay, metadata, continuation))
}

fn decode_cell(chunk: &[u8]) -> Result<Cell> {
    let mut raw = [0u8; CELL_WIRE_SIZE];
    raw.copy_from_slice(chunk);
    Cell::from_bytes(&raw)
}

fn decode_cells(value: &[u8], table: &BTreeMap<u32, String>) -> Result<Vec<Cell>> {
    if value.len() % CELL_WIRE_SIZE != 0 {
        return Err(BufferError::malformed(format!(
            "Line record length {} is not a multiple of {CELL_WIRE_SIZE}",
            value.len()
        )));
    }
    value
        .chunks_exact(CELL_WIRE_SIZE)
        .map(|chunk| {
            let cell = decode_cell(chunk)?;
            if cell.is_complex() && !table.contains_key(&cell.code()) {
                return Err(BufferError::malformed(format!(
                    "complex key {} has no string",
                    cell.code()
                )));
            }
            Ok(cell)
        })
        .collect()
}

/// Read the complex string table: the producer's key for each string.
fn decode_complex(value: &[u8]) -> Result<BTreeMap<u32, String>> {
    let mut reader = Reader::new(value);
    let count = reader.len()?;
    let mut table = BTreeMap::new();
    for _ in 0..count {
        let key = reader.u32()?;
        let text = reader.string()?;
        if text.chars().nth(1).is_none() {
            return Err(BufferError::malformed("complex string is a single scalar"));
        }
        if table.insert(key, text).is_some() {
            return Err(BufferError::malformed(format!("complex key {key} repeated")));
        }
    }
    reader.finish("ComplexChars")?;
    Ok(table)
}

fn decode_overlay(value: &[u8], cell_count: usize) -> Result<ExternalAttributes> {
    let mut reader = Reader::new(value);
    let count = reader.len()?;
    let mut overlay = ExternalAttributes::new();
    let mut previous = None;
    for _ in 0..count {
        let index = reader.len()?;
        if index >= cell_count {
            return Err(BufferError::malformed(format!(
                "overlay index {index} past {cell_count} cells"
            )));
        }
        if previous.is_some_and(|p| index <= p) {
            return Err(BufferError::malformed("overlay indices not ascending"));
        }
        previous = Some(index);
        let attr = decode_attribute(&mut reader)?;
        if attr.is_empty() {
            return Err(BufferError::malformed("empty overlay attribute"));
        }
        overlay.set(index, attr);
    }
    reader.finish("Overlay")?;
    Ok(overlay)
}

fn decode_attribute(reader: &mut Reader<'_>) -> Result<ExternalAttribute> {
    let mask = reader.u8()?;
    if mask & !(HAS_UNDERLINE | HAS_HYPERLINK | HAS_BLOCK_ID | HAS_CONTROL) != 0 {
        return Err(BufferError::malformed(format!("unknown attribute bits {mask:#x}")));
    }
    let mut attr = ExternalAttribute::default();
    if mask & HAS_UNDERLINE != 0 {
        attr.underline_color = Some(Color::from_bytes(reader.array()?)?);
    }
    if mask & HAS_HYPERLINK != 0 {
        let url = reader.string()?;
        let id = match reader.u8()? {
            0 => None,
            1 => Some(reader.string()?),
            other => return Err(BufferError::malformed(format!("bad hyperlink id marker {other}"))),
        };
        attr.hyperlink = Some(Arc::new(Hyperlink { url, id }));
    }
    if mask & HAS_BLOCK_ID != 0 {
        attr.block_id = Some(Arc::from(reader.string()?));
    }
    if mask & HAS_CONTROL != 0 {
        attr.control_code = Some(i32::from_le_bytes(reader.array()?));
    }
    Ok(attr)
}

fn decode_metadata(value: &[u8]) -> Result<LineMetadata> {
    if value.len() != METADATA_LEN {
        return Err(BufferError::malformed(format!(
            "Metadata record is {} bytes, expected {METADATA_LEN}",
            value.len()
        )));
    }
    let mut reader = Reader::new(value);
    let generation = u64::from_le_bytes(reader.array()?);
    let timestamp = f64::from_bits(u64::from_le_bytes(reader.array()?));
    let rtl_found = match reader.u8()? {
        0 => false,
        1 => true,
        other => return Err(BufferError::malformed(format!("bad rtl flag {other}"))),
    };
    Ok(LineMetadata {
        generation,
        timestamp,
        rtl_found,
    })
}

fn decode_continuation(value: &[u8]) -> Result<Cell> {
    if value.len() != CELL_WIRE_SIZE {
        return Err(BufferError::malformed(format!(
            "Continuation record is {} bytes",
            value.len()
        )));
    }
    let cell = decode_cell(value)?;
    if Eol::from_code(cell.code()).is_none() || !cell.flags().is_empty() {
        return Err(BufferError::malformed("continuation cell is not an EOL marker"));
    }
    Ok(cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{AsciiRun, Style};
    use pretty_assertions::assert_eq;

    fn sample() -> LineBuf {
        let mut line = LineBuf::with_width(8);
        line.write_ascii(0, b"hi", Cell::EMPTY.with_style(Style::BOLD), None)
            .unwrap();
        line.set_wide_character(2, Cell::from_char('日')).unwrap();
        line.set_character(4, Cell::from_grapheme("e\u{301}")).unwrap();
        let attr = ExternalAttribute {
            underline_color: Some(Color::Indexed(9)),
            hyperlink: Some(Arc::new(Hyperlink {
                url: "https://example.com".into(),
                id: Some("x1".into()),
            })),
            block_id: Some(Arc::from("blk")),
            control_code: Some(-3),
        };
        line.set_attribute(1, Some(&attr)).unwrap();
        line.set_attribute(5, Some(&ExternalAttribute::with_hyperlink(Hyperlink::new("u"))))
            .unwrap();
        line.set_eol(Eol::Soft);
        line.set_metadata(LineMetadata {
            generation: 42,
            timestamp: 1.5,
            rtl_found: true,
        });
        line
    }

    #[test]
    fn test_round_trip_full_line() {
        let line = sample();
        let bytes = line.encode(0..8).unwrap();
        let decoded = decode_line(&bytes).unwrap();
        assert!(decoded.is_equal(&line));
        assert_eq!(decoded.metadata(), line.metadata());
        assert_eq!(decoded.eol(), Eol::Soft);
        assert_eq!(decoded.string_value(), line.string_value());
    }

    #[test]
    fn test_round_trip_sub_range() {
        let line = sample();
        let bytes = line.encode(1..6).unwrap();
        let decoded = decode_line(&bytes).unwrap();
        assert!(decoded.is_equal(&line.substring(1..6).unwrap()));
        assert!(decoded.external_attribute(0).is_some());
    }

    #[test]
    fn test_overlay_record_omitted_when_empty() {
        let run = AsciiRun::new(b"abc".to_vec(), Cell::EMPTY);
        let bytes = run.encode(0..3).unwrap();
        let records = Records::split(&bytes).unwrap();
        assert!(records.overlay.is_none());
        assert!(records.complex.is_none());
        assert_eq!(records.line.map(<[u8]>::len), Some(48));
    }

    #[test]
    fn test_complex_keys_are_remapped() {
        let cell = Cell::from_grapheme("e\u{301}");
        // A producer in another process may have used any key.
        let foreign = cell.code() + 1000;
        let mut out = Vec::new();
        put_record(&mut out, Tag::Line, &cell.with_code(foreign).to_bytes()).unwrap();
        put_record(&mut out, Tag::Metadata, &[0; METADATA_LEN]).unwrap();
        put_record(&mut out, Tag::Continuation, &Cell::continuation(Eol::Hard).to_bytes())
            .unwrap();
        let mut table = Vec::new();
        put_u32(&mut table, 1).unwrap();
        table.extend_from_slice(&foreign.to_le_bytes());
        put_str(&mut table, "e\u{301}").unwrap();
        put_record(&mut out, Tag::ComplexChars, &table).unwrap();

        let decoded = decode_line(&out).unwrap();
        assert_eq!(decoded.character(0).unwrap().code(), cell.code());
        assert_eq!(decoded.string_value(), "e\u{301}");
    }

    #[test]
    fn test_complex_cell_without_table_is_rejected() {
        let mut out = Vec::new();
        let cell = Cell::from_grapheme("a\u{308}");
        put_record(&mut out, Tag::Line, &cell.to_bytes()).unwrap();
        put_record(&mut out, Tag::Metadata, &[0; METADATA_LEN]).unwrap();
        put_record(&mut out, Tag::Continuation, &Cell::continuation(Eol::Hard).to_bytes())
            .unwrap();
        assert!(matches!(decode_line(&out), Err(BufferError::MalformedData(_))));
    }

    #[test]
    fn test_rejected_stream_interns_nothing() {
        let text = "u\u{308}\u{304}\u{331}";
        let mut out = Vec::new();
        // Any complex cell, carrying the producer's key 7.
        let cell = Cell::from_grapheme("a\u{308}").with_code(7);
        put_record(&mut out, Tag::Line, &cell.to_bytes()).unwrap();
        put_record(&mut out, Tag::Metadata, &[0; METADATA_LEN]).unwrap();
        // Continuation with a bad EOL code.
        put_record(&mut out, Tag::Continuation, &Cell::EMPTY.with_code(9).to_bytes())
            .unwrap();
        let mut table = Vec::new();
        put_u32(&mut table, 1).unwrap();
        table.extend_from_slice(&7u32.to_le_bytes());
        put_str(&mut table, text).unwrap();
        put_record(&mut out, Tag::ComplexChars, &table).unwrap();

        assert!(matches!(decode_line(&out), Err(BufferError::MalformedData(_))));
        assert_eq!(complex::key_of(text), None);
    }

    #[test]
    fn test_cut_wide_pair_decodes_as_encoded() {
        let line = LineBuf::from_cells(vec![
            Cell::ascii(b'a'),
            Cell::from_char('日'),
            Cell::from_char('日').continuation_of(),
            Cell::ascii(b'b'),
        ]);
        let decoded = decode_line(&line.encode(2..4).unwrap()).unwrap();
        assert!(decoded.character(0).unwrap().is_wide_continuation());
        assert!(decoded.is_equal(&line.substring(2..4).unwrap()));
    }

    #[test]
    fn test_truncated_stream_is_rejected() {
        let bytes = sample().encode(0..8).unwrap();
        for cut in [1, 4, 5, 20, bytes.len() - 1] {
            assert!(
                matches!(decode_line(&bytes[..cut]), Err(BufferError::MalformedData(_))),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_duplicate_tag_is_rejected() {
        let bytes = LineBuf::with_width(2).encode(0..2).unwrap();
        let mut doubled = bytes.clone();
        doubled.extend_from_slice(&bytes);
        assert!(matches!(decode_line(&doubled), Err(BufferError::MalformedData(_))));
    }

    #[test]
    fn test_missing_and_unknown_tags_are_rejected() {
        let mut out = Vec::new();
        put_record(&mut out, Tag::Line, &[]).unwrap();
        assert!(decode_line(&out).is_err());

        let mut bytes = LineBuf::new().encode(0..0).unwrap();
        bytes.extend_from_slice(&[9, 0, 0, 0, 0]);
        assert!(decode_line(&bytes).is_err());
    }

    #[test]
    fn test_overlay_index_out_of_range_is_rejected() {
        let mut value = Vec::new();
        put_u32(&mut value, 1).unwrap();
        put_u32(&mut value, 5).unwrap();
        put_attribute(&mut value, &ExternalAttribute::with_hyperlink(Hyperlink::new("u")))
            .unwrap();
        let mut bytes = LineBuf::with_width(2).encode(0..2).unwrap();
        put_record(&mut bytes, Tag::Overlay, &value).unwrap();
        assert!(matches!(decode_line(&bytes), Err(BufferError::MalformedData(_))));
    }

    #[test]
    fn test_bad_continuation_is_rejected() {
        let mut out = Vec::new();
        put_record(&mut out, Tag::Line, &[]).unwrap();
        put_record(&mut out, Tag::Metadata, &[0; METADATA_LEN]).unwrap();
        put_record(&mut out, Tag::Continuation, &Cell::ascii(b'x').to_bytes()).unwrap();
        assert!(decode_line(&out).is_err());
    }
}
