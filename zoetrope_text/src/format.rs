// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Character and paragraph formatting.

use alloc::rc::Rc;
use core::fmt;

use crate::font::FontTable;

/// Horizontal paragraph alignment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Align {
    /// Lines start at the left margin (plus first-line indent).
    #[default]
    Left,
    /// Lines are centered in the leftover space.
    Center,
    /// Lines end at the right margin.
    Right,
    /// Justified. Space redistribution is intentionally not performed;
    /// lines lay out as with [`Align::Left`].
    Justify,
}

/// Automatic sizing behavior for a text field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AutoSize {
    /// The field keeps its explicit width and height.
    #[default]
    None,
    /// The field grows rightward from its left edge.
    Left,
    /// The field grows symmetrically around its center.
    Center,
    /// The field grows leftward from its right edge.
    Right,
}

/// Whether a field is display-only or accepts user input.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Script-settable, not user-editable.
    #[default]
    Dynamic,
    /// User-editable; owns a cursor and accepts key events.
    Input,
}

/// Character- and paragraph-level formatting for a span of text.
///
/// A format is a plain value; fields share them behind `Rc` so the
/// tokenizer can detect "same format as last pass" by pointer identity.
#[derive(Clone)]
pub struct TextFormat {
    /// Metrics provider for the face this format renders with.
    pub font: Rc<dyn FontTable>,
    /// Point size.
    pub size: f64,
    /// 0xRRGGBB text color.
    pub color: u32,
    /// Extra vertical space below each line.
    pub leading: f64,
    /// Extra horizontal space after each non-whitespace character.
    pub letter_spacing: f64,
    /// Paragraph left margin.
    pub left_margin: f64,
    /// Paragraph right margin.
    pub right_margin: f64,
    /// First-line indent.
    pub indent: f64,
    /// Paragraph alignment.
    pub align: Align,
}

impl TextFormat {
    /// Creates a format with the given face and size and neutral spacing.
    #[must_use]
    pub fn new(font: Rc<dyn FontTable>, size: f64, color: u32) -> Self {
        Self {
            font,
            size,
            color,
            leading: 0.0,
            letter_spacing: 0.0,
            left_margin: 0.0,
            right_margin: 0.0,
            indent: 0.0,
            align: Align::Left,
        }
    }

    /// Line height of this format, including leading.
    #[must_use]
    pub fn line_height(&self) -> f64 {
        self.font.line_height(self.size) + self.leading
    }

    /// Returns whether two formats are visually identical (same face by
    /// identity, same metrics-affecting properties).
    #[must_use]
    pub fn visual_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.font, &other.font)
            && self.size == other.size
            && self.color == other.color
            && self.leading == other.leading
            && self.letter_spacing == other.letter_spacing
            && self.left_margin == other.left_margin
            && self.right_margin == other.right_margin
            && self.indent == other.indent
            && self.align == other.align
    }
}

impl fmt::Debug for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFormat")
            .field("size", &self.size)
            .field("color", &self.color)
            .field("leading", &self.leading)
            .field("letter_spacing", &self.letter_spacing)
            .field("left_margin", &self.left_margin)
            .field("right_margin", &self.right_margin)
            .field("indent", &self.indent)
            .field("align", &self.align)
            .finish_non_exhaustive()
    }
}

/// A partial format: only the set fields are applied.
///
/// This is the merge vehicle for ranged format application — the analog of
/// applying a format object whose unset properties are null.
#[derive(Clone, Default)]
pub struct TextFormatUpdate {
    /// New face, if set.
    pub font: Option<Rc<dyn FontTable>>,
    /// New point size, if set.
    pub size: Option<f64>,
    /// New color, if set.
    pub color: Option<u32>,
    /// New leading, if set.
    pub leading: Option<f64>,
    /// New letter spacing, if set.
    pub letter_spacing: Option<f64>,
    /// New left margin, if set.
    pub left_margin: Option<f64>,
    /// New right margin, if set.
    pub right_margin: Option<f64>,
    /// New indent, if set.
    pub indent: Option<f64>,
    /// New alignment, if set.
    pub align: Option<Align>,
}

impl fmt::Debug for TextFormatUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFormatUpdate")
            .field("font", &self.font.as_ref().map(|_| "<font>"))
            .field("size", &self.size)
            .field("color", &self.color)
            .field("leading", &self.leading)
            .field("letter_spacing", &self.letter_spacing)
            .field("left_margin", &self.left_margin)
            .field("right_margin", &self.right_margin)
            .field("indent", &self.indent)
            .field("align", &self.align)
            .finish()
    }
}

impl TextFormatUpdate {
    /// Applies every set field onto `target`.
    pub fn apply_to(&self, target: &mut TextFormat) {
        if let Some(font) = &self.font {
            target.font = font.clone();
        }
        if let Some(size) = self.size {
            target.size = size;
        }
        if let Some(color) = self.color {
            target.color = color;
        }
        if let Some(leading) = self.leading {
            target.leading = leading;
        }
        if let Some(letter_spacing) = self.letter_spacing {
            target.letter_spacing = letter_spacing;
        }
        if let Some(left_margin) = self.left_margin {
            target.left_margin = left_margin;
        }
        if let Some(right_margin) = self.right_margin {
            target.right_margin = right_margin;
        }
        if let Some(indent) = self.indent {
            target.indent = indent;
        }
        if let Some(align) = self.align {
            target.align = align;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::MetricsTable;

    fn base() -> TextFormat {
        TextFormat::new(Rc::new(MetricsTable::monospace(10.0, 5.0, 12.0)), 10.0, 0)
    }

    #[test]
    fn update_applies_only_set_fields() {
        let mut fmt = base();
        let update = TextFormatUpdate {
            color: Some(0xFF_0000),
            indent: Some(3.0),
            ..TextFormatUpdate::default()
        };
        update.apply_to(&mut fmt);
        assert_eq!(fmt.color, 0xFF_0000);
        assert_eq!(fmt.indent, 3.0);
        assert_eq!(fmt.size, 10.0, "unset fields stay untouched");
    }

    #[test]
    fn visual_eq_requires_same_face() {
        let a = base();
        let mut b = a.clone();
        assert!(a.visual_eq(&b));
        b.font = Rc::new(MetricsTable::monospace(10.0, 5.0, 12.0));
        assert!(!a.visual_eq(&b), "different face identity");
    }

    #[test]
    fn line_height_includes_leading() {
        let mut fmt = base();
        fmt.leading = 2.0;
        assert_eq!(fmt.line_height(), 14.0);
    }
}
