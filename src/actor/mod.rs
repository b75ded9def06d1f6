//! Actor Model: one writer thread, one snapshot reader handle.
//!
//! The screen is owned by a single ingest thread. Everything else talks to
//! it through channels:
//!
//! ```text
//! ┌──────────────┐   WriterCommand    ┌───────────────┐
//! │   Producer   │ ─────────────────▶ │ Ingest Thread │
//! └──────────────┘   (bounded queue)  │  owns Screen  │
//!                                     └───────┬───────┘
//!                                             │ Arc<ScreenSnapshot>
//!                                             ▼ (single-slot mailbox)
//!                                     ┌───────────────┐
//!                                     │    Reader     │
//!                                     └───────────────┘
//! ```
//!
//! The writer never blocks on a reader: a snapshot nobody picked up yet is
//! replaced by the next one. Readers never see a partially applied token.

mod engine;
mod mailbox;
mod messages;

pub use engine::{EngineConfig, IngestActor};
pub use mailbox::SnapshotReader;
pub use messages::{IngestStats, WriterCommand};
