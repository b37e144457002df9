// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font metrics provider trait.
//!
//! Glyph geometry and rasterization are external concerns; the layout engine
//! consults a [`FontTable`] only for per-character advances and line heights,
//! as pure functions of the requested point size. A table that cannot answer
//! for a character reports it via [`has_char`](FontTable::has_char), and the
//! input controller rejects typing it.

use alloc::collections::BTreeMap;

/// Per-character metrics for a single font face.
///
/// All queries take the point size explicitly, so implementations can stay
/// immutable and be shared freely behind `Rc`.
pub trait FontTable {
    /// Returns the rendered advance of `ch` at `size`, excluding letter
    /// spacing.
    fn char_width(&self, size: f64, ch: char) -> f64;

    /// Returns the line height at `size`.
    fn line_height(&self, size: f64) -> f64;

    /// Returns whether the face carries a glyph for `ch`.
    fn has_char(&self, ch: char) -> bool;
}

/// A data-driven [`FontTable`] with explicit per-character advances.
///
/// Advances are stored in em units at `em_size` and scale linearly with the
/// requested size. Characters without an entry use `default_advance`; set
/// `strict` to make them unknown instead (so input is rejected for them).
#[derive(Clone, Debug)]
pub struct MetricsTable {
    /// Size the stored advances are expressed at.
    pub em_size: f64,
    /// Advance used for characters with no explicit entry.
    pub default_advance: f64,
    /// Line height at `em_size`.
    pub em_line_height: f64,
    /// Explicit per-character advances at `em_size`.
    pub advances: BTreeMap<char, f64>,
    /// Whether characters without an entry are reported as missing.
    pub strict: bool,
}

impl MetricsTable {
    /// Creates a table where every character advances by `advance` and lines
    /// are `line_height` tall, both at `em_size`.
    #[must_use]
    pub fn monospace(em_size: f64, advance: f64, line_height: f64) -> Self {
        Self {
            em_size,
            default_advance: advance,
            em_line_height: line_height,
            advances: BTreeMap::new(),
            strict: false,
        }
    }

    /// Sets an explicit advance for `ch` at `em_size`.
    pub fn set_advance(&mut self, ch: char, advance: f64) {
        self.advances.insert(ch, advance);
    }
}

impl FontTable for MetricsTable {
    fn char_width(&self, size: f64, ch: char) -> f64 {
        let em = self
            .advances
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        em * size / self.em_size
    }

    fn line_height(&self, size: f64) -> f64 {
        self.em_line_height * size / self.em_size
    }

    fn has_char(&self, ch: char) -> bool {
        !self.strict || self.advances.contains_key(&ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_scales_with_size() {
        let table = MetricsTable::monospace(10.0, 5.0, 12.0);
        assert_eq!(table.char_width(10.0, 'a'), 5.0);
        assert_eq!(table.char_width(20.0, 'a'), 10.0);
        assert_eq!(table.line_height(20.0), 24.0);
    }

    #[test]
    fn explicit_advance_overrides_default() {
        let mut table = MetricsTable::monospace(10.0, 5.0, 12.0);
        table.set_advance('W', 9.0);
        assert_eq!(table.char_width(10.0, 'W'), 9.0);
        assert_eq!(table.char_width(10.0, 'i'), 5.0);
    }

    #[test]
    fn strict_table_reports_missing_chars() {
        let mut table = MetricsTable::monospace(10.0, 5.0, 12.0);
        table.strict = true;
        table.set_advance('a', 5.0);
        assert!(table.has_char('a'));
        assert!(!table.has_char('b'));
    }
}
