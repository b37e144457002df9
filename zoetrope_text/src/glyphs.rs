// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-format glyph batches.
//!
//! Positioned characters are grouped into one batch per visually distinct
//! format, the granularity at which the renderer binds color and face. The
//! tokenizer's change signal controls the rebuild depth: when it fired,
//! batches are regrouped from scratch; otherwise the glyph lists are kept
//! and only their positions are refreshed, so pure movement (alignment,
//! box resize) never reallocates.

use alloc::rc::Rc;
use alloc::vec::Vec;

use kurbo::Rect;

use crate::field::{LayoutDirty, TextField};
use crate::format::TextFormat;

/// One positioned, renderable character.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedGlyph {
    /// The character.
    pub ch: char,
    /// Absolute x of the glyph box's left edge.
    pub x: f64,
    /// Absolute y of the glyph box's top edge.
    pub y: f64,
    /// Advance width.
    pub width: f64,
}

/// All glyphs sharing one visual format.
#[derive(Clone, Debug)]
pub struct GlyphBatch {
    /// The format every glyph in this batch renders with.
    pub format: Rc<TextFormat>,
    /// Placed glyphs, in character order. Whitespace carries no geometry
    /// and is excluded.
    pub glyphs: Vec<PlacedGlyph>,
    /// Union of the glyph boxes.
    pub bounds: Rect,
}

impl TextField {
    /// Rebuilds or repositions the glyph batches from the current layout.
    pub(crate) fn build_glyph_batches(&mut self) {
        let regroup = self.dirty.contains(LayoutDirty::BATCHES) || self.batches.is_empty();

        if regroup {
            self.batches.clear();
            for tr in 0..self.runs.len() {
                let run = self.runs[tr];
                if run.count == 0 {
                    continue;
                }
                let format = self.run_formats[tr].clone();
                let batch = self.batch_index_for(&format);
                for w in run.start..run.start + run.count {
                    let word = self.words.get(w);
                    for c in word.start..word.start + word.len {
                        let ch = self.char_codes[c];
                        if ch == ' ' || ch == '\t' {
                            continue;
                        }
                        self.batches[batch].glyphs.push(PlacedGlyph {
                            ch,
                            x: self.char_positions_x[c],
                            y: self.char_positions_y[c],
                            width: self.char_widths[c],
                        });
                    }
                }
            }
            self.dirty.remove(LayoutDirty::BATCHES);
        } else {
            // Same characters, new positions: refresh in place, in the
            // same traversal order the batches were built in.
            let mut cursors: Vec<usize> = Vec::new();
            cursors.resize(self.batches.len(), 0);
            for tr in 0..self.runs.len() {
                let run = self.runs[tr];
                if run.count == 0 {
                    continue;
                }
                let format = self.run_formats[tr].clone();
                let batch = self.batch_index_for(&format);
                for w in run.start..run.start + run.count {
                    let word = self.words.get(w);
                    for c in word.start..word.start + word.len {
                        let ch = self.char_codes[c];
                        if ch == ' ' || ch == '\t' {
                            continue;
                        }
                        let g = &mut self.batches[batch].glyphs[cursors[batch]];
                        g.x = self.char_positions_x[c];
                        g.y = self.char_positions_y[c];
                        cursors[batch] += 1;
                    }
                }
            }
        }

        for batch in &mut self.batches {
            batch.bounds = batch_bounds(batch);
        }
    }

    /// Index of the batch for `format`, creating it if needed.
    fn batch_index_for(&mut self, format: &Rc<TextFormat>) -> usize {
        if let Some(i) = self
            .batches
            .iter()
            .position(|b| b.format.visual_eq(format))
        {
            return i;
        }
        self.batches.push(GlyphBatch {
            format: format.clone(),
            glyphs: Vec::new(),
            bounds: Rect::ZERO,
        });
        self.batches.len() - 1
    }
}

fn batch_bounds(batch: &GlyphBatch) -> Rect {
    let line_height = batch.format.line_height();
    let mut bounds: Option<Rect> = None;
    for g in &batch.glyphs {
        let r = Rect::new(g.x, g.y, g.x + g.width, g.y + line_height);
        bounds = Some(match bounds {
            Some(b) => b.union(r),
            None => r,
        });
    }
    bounds.unwrap_or(Rect::ZERO)
}
