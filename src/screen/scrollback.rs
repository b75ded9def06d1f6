//! Scrollback: chunked storage for lines that scrolled off the grid.
//!
//! This module provides a rope-like structure optimized for:
//! - O(1) append and O(1) random access
//! - Exact eviction at the configured capacity
//! - Cheap snapshots: chunks are `Arc`-shared, so cloning the scrollback for
//!   a reader copies one pointer per chunk, not one per line

use crate::buffer::LineSnapshot;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// Number of lines per chunk.
/// Tuned for a balance between overhead and cache utilization.
const CHUNK_SIZE: usize = 64;

type Chunk = Vec<LineSnapshot>;

/// Bounded history of frozen lines.
///
/// Every chunk except the last holds exactly `CHUNK_SIZE` lines. Evicted
/// lines at the head of the first chunk are skipped rather than removed, and
/// the chunk is dropped once all of its lines are evicted.
#[derive(Debug, Clone)]
pub struct Scrollback {
    /// Chunks of lines, oldest first.
    chunks: VecDeque<Arc<Chunk>>,
    /// Evicted lines still physically present in the first chunk.
    head_skip: usize,
    /// Number of live lines.
    len: usize,
    /// Maximum number of lines to retain.
    max_lines: usize,
}

impl Scrollback {
    /// Create an empty scrollback holding at most `max_lines` lines.
    ///
    /// With `max_lines == 0` every pushed line is dropped immediately.
    pub const fn new(max_lines: usize) -> Self {
        Self {
            chunks: VecDeque::new(),
            head_skip: 0,
            len: 0,
            max_lines,
        }
    }

    /// Number of retained lines.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if there are no retained lines.
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Configured capacity.
    pub const fn max_lines(&self) -> usize {
        self.max_lines
    }

    /// Get the number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Get a line by index, 0 being the oldest retained line.
    pub fn get(&self, index: usize) -> Option<&LineSnapshot> {
        if index >= self.len {
            return None;
        }
        let physical = index + self.head_skip;
        self.chunks
            .get(physical / CHUNK_SIZE)?
            .get(physical % CHUNK_SIZE)
    }

    /// The most recently pushed line.
    pub fn last(&self) -> Option<&LineSnapshot> {
        self.len.checked_sub(1).and_then(|i| self.get(i))
    }

    /// Push a line, evicting the oldest one if over capacity.
    ///
    /// Returns the number of lines evicted.
    pub fn push(&mut self, line: LineSnapshot) -> usize {
        if self.max_lines == 0 {
            return 1;
        }
        // Check if we need a new chunk
        if self.chunks.back().is_none_or(|c| c.len() >= CHUNK_SIZE) {
            self.chunks.push_back(Arc::new(Vec::with_capacity(CHUNK_SIZE)));
        }
        if let Some(chunk) = self.chunks.back_mut() {
            // Copies the tail chunk only while a reader still holds it.
            Arc::make_mut(chunk).push(line);
            self.len += 1;
        }

        let mut evicted = 0;
        while self.len > self.max_lines {
            self.evict_front();
            evicted += 1;
        }
        if evicted > 0 {
            trace!(evicted, retained = self.len, "scrollback eviction");
        }
        evicted
    }

    fn evict_front(&mut self) {
        self.head_skip += 1;
        self.len -= 1;
        if self.head_skip == CHUNK_SIZE {
            self.chunks.pop_front();
            self.head_skip = 0;
        }
    }

    /// Shrink or grow the capacity, evicting from the front as needed.
    pub fn set_max_lines(&mut self, max_lines: usize) {
        self.max_lines = max_lines;
        if max_lines == 0 {
            self.clear();
            return;
        }
        while self.len > max_lines {
            self.evict_front();
        }
    }

    /// Clear all content.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.head_skip = 0;
        self.len = 0;
    }

    /// Iterate over lines, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &LineSnapshot> + '_ {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .skip(self.head_skip)
    }

    /// The newest `count` lines, oldest first.
    pub fn tail(&self, count: usize) -> impl Iterator<Item = &LineSnapshot> + '_ {
        let start = self.len.saturating_sub(count);
        (start..self.len).filter_map(move |i| self.get(i))
    }
}
