//! Message types for actor communication.
//!
//! These types define the protocol between the ingest actor and its clients.

use crate::screen::Token;

/// Commands sent to the ingest thread.
#[derive(Debug)]
pub enum WriterCommand {
    /// Apply tokens to the screen, in order.
    Tokens(Vec<Token>),

    /// Publish a snapshot now instead of waiting for the interval.
    Publish,

    /// Change the scrollback capacity.
    SetMaxScrollback(usize),

    /// Publish a final snapshot and stop the ingest thread.
    Shutdown,
}

/// Ingest statistics for debugging/profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Tokens applied to the screen.
    pub tokens: u64,
    /// Bytes written through the bulk path.
    pub gang_bytes: u64,
    /// Snapshots published.
    pub published: u64,
    /// Snapshots replaced before any reader took them.
    pub superseded: u64,
}
