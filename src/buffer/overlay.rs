//! Attribute overlay: sparse per-cell attributes too rare to inline.
//!
//! Cells are 16 bytes and stay that way. Hyperlinks, underline colors, block
//! ids and control codes live in an [`ExternalAttributes`] side table keyed
//! by cell index. A missing entry means "no extended attributes"; an
//! attribute with every field unset is never stored.

use super::cell::Color;
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::Arc;

/// A hyperlink target (OSC 8).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hyperlink {
    /// Link target.
    pub url: String,
    /// Optional `id=` parameter used to group cells of one link.
    pub id: Option<String>,
}

impl Hyperlink {
    /// Create a hyperlink without an id.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            id: None,
        }
    }
}

/// Extended attributes for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct ExternalAttribute {
    /// Underline color, when different from the foreground.
    pub underline_color: Option<Color>,
    /// Hyperlink the cell belongs to.
    pub hyperlink: Option<Arc<Hyperlink>>,
    /// Identifier of the block (e.g. a command output region).
    pub block_id: Option<Arc<str>>,
    /// Control code the cell stands in for when rendered as a glyph.
    pub control_code: Option<i32>,
}

impl ExternalAttribute {
    /// An attribute carrying just a hyperlink.
    pub fn with_hyperlink(link: Hyperlink) -> Self {
        Self {
            hyperlink: Some(Arc::new(link)),
            ..Self::default()
        }
    }

    /// An attribute carrying just an underline color.
    pub const fn with_underline_color(color: Color) -> Self {
        Self {
            underline_color: Some(color),
            hyperlink: None,
            block_id: None,
            control_code: None,
        }
    }

    /// True if no field is set.
    pub const fn is_empty(&self) -> bool {
        self.underline_color.is_none()
            && self.hyperlink.is_none()
            && self.block_id.is_none()
            && self.control_code.is_none()
    }
}

/// Sparse index → attribute table.
///
/// Backed by a `BTreeMap` so range copies and shifts walk only the entries
/// involved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalAttributes {
    entries: BTreeMap<usize, ExternalAttribute>,
}

impl ExternalAttributes {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Number of cells with attributes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no cell has attributes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attributes of the cell at `index`.
    pub fn get(&self, index: usize) -> Option<&ExternalAttribute> {
        self.entries.get(&index)
    }

    /// Set the attributes of one cell. An empty attribute removes the entry.
    pub fn set(&mut self, index: usize, attr: ExternalAttribute) {
        if attr.is_empty() {
            self.entries.remove(&index);
        } else {
            self.entries.insert(index, attr);
        }
    }

    /// Highest index with an entry.
    pub fn last_index(&self) -> Option<usize> {
        self.entries.keys().next_back().copied()
    }

    /// Iterate over `(index, attribute)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &ExternalAttribute)> {
        self.entries.iter().map(|(&i, a)| (i, a))
    }

    /// Iterate over entries in `range`, with indices rebased to `range.start`.
    pub fn iter_range(
        &self,
        range: Range<usize>,
    ) -> impl Iterator<Item = (usize, &ExternalAttribute)> {
        let base = range.start;
        self.entries.range(range).map(move |(&i, a)| (i - base, a))
    }

    /// Remove every entry in `start..start + count`.
    pub fn clear_range(&mut self, start: usize, count: usize) {
        if count == 0 || self.entries.is_empty() {
            return;
        }
        let mut tail = self.entries.split_off(&start);
        let mut after = tail.split_off(&(start + count));
        self.entries.append(&mut after);
    }

    /// Copy `source[src_start..src_start + count]` onto
    /// `self[dst_start..dst_start + count]`.
    ///
    /// Existing entries in the destination range are cleared first, so cells
    /// without attributes in the source end up without attributes here.
    pub fn copy_range(&mut self, source: &Self, src_start: usize, dst_start: usize, count: usize) {
        self.clear_range(dst_start, count);
        for (offset, attr) in source.iter_range(src_start..src_start + count) {
            self.entries.insert(dst_start + offset, attr.clone());
        }
    }

    /// Make room for `count` cells inserted at `at`.
    pub fn shift_for_insert(&mut self, at: usize, count: usize) {
        if count == 0 {
            return;
        }
        let tail = self.entries.split_off(&at);
        self.entries
            .extend(tail.into_iter().map(|(i, a)| (i + count, a)));
    }

    /// Drop entries for `start..start + count` and close the gap.
    pub fn shift_for_delete(&mut self, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        let mut tail = self.entries.split_off(&start);
        let after = tail.split_off(&(start + count));
        self.entries
            .extend(after.into_iter().map(|(i, a)| (i - count, a)));
    }

    /// Drop every entry at or past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.entries.retain(|&i, _| i < len);
    }

    /// Entries of `start..start + count`, rebased to 0.
    pub fn slice(&self, start: usize, count: usize) -> Self {
        Self {
            entries: self
                .iter_range(start..start + count)
                .map(|(i, a)| (i, a.clone()))
                .collect(),
        }
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<(usize, ExternalAttribute)> for ExternalAttributes {
    fn from_iter<T: IntoIterator<Item = (usize, ExternalAttribute)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (i, a) in iter {
            table.set(i, a);
        }
        table
    }
}
