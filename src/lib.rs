//! # Scrollcell
//!
//! A terminal line-buffer engine for high-volume output.
//!
//! Scrollcell stores terminal content as compact 16-byte cells, lets a single
//! writer mutate lines in place while readers hold immutable snapshots, and
//! ingests long runs of plain ASCII through a bulk path that produces exactly
//! what character-at-a-time ingestion would.
//!
//! ## Core Concepts
//!
//! - **Compact cells**: 16-byte `Copy` cells, with rare attributes in a sparse overlay
//! - **Copy-on-write lines**: snapshots share storage until the writer touches a line
//! - **Gang ingestion**: one bulk copy per row instead of one write per byte
//! - **TLV codec**: lines survive thread and process boundaries
//! - **Actor model**: one ingest thread, lock-free snapshot handoff to readers
//!
//! ## Example
//!
//! ```rust
//! use scrollcell::{CellString, GangToken, Screen};
//!
//! let mut screen = Screen::new(10, 3, 100).unwrap();
//! let token = GangToken::from_ascii("hello\r\nworld").unwrap();
//! screen.append_mixed_ascii_gang(&[token]);
//!
//! assert_eq!(screen.line(1).unwrap().string_value(), "world");
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod buffer;
pub mod error;
pub mod screen;

// Re-exports for convenience
pub use actor::{EngineConfig, IngestActor, IngestStats, SnapshotReader, WriterCommand};
pub use buffer::{
    decode_line, AsciiRun, Cell, CellFlags, CellString, Color, Eol, ExternalAttribute,
    ExternalAttributes, Hyperlink, LineBuf, LineMetadata, LineSnapshot, Rgb, RtlStatus, Style,
    UniformRun,
};
pub use error::{BufferError, Result};
pub use screen::{Cursor, GangToken, Pen, Screen, ScreenSnapshot, Token};
