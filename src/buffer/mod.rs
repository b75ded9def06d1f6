//! Buffer module: cells and the line strings built from them.
//!
//! This module contains:
//! - [`Cell`]: The atomic unit of content, 16 bytes and `Copy`
//! - [`ExternalAttributes`]: Sparse per-cell attributes (hyperlinks, underline colors)
//! - [`CellString`]: Read capability shared by every line representation
//! - [`LineBuf`]: The writer's mutable line
//! - [`LineSnapshot`]: Immutable, structurally shared line view
//! - [`codec`]: Tag-length-value encoding of lines

mod cell;
pub mod codec;
pub mod complex;
mod line_buf;
mod overlay;
mod runs;
mod snapshot;
mod string;

pub use cell::{Cell, CellFlags, Color, Eol, Grapheme, Rgb, RtlStatus, Style, CELL_WIRE_SIZE};
pub use codec::decode_line;
pub use line_buf::LineBuf;
pub use overlay::{ExternalAttribute, ExternalAttributes, Hyperlink};
pub use runs::{AsciiRun, UniformRun};
pub use snapshot::LineSnapshot;
pub use string::{text_of, used_length_of, CellString, LineMetadata};
