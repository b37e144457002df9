// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The text field entity and its staged rebuild pipeline.
//!
//! A [`TextField`] keeps three views of its text: the raw string as
//! assigned, the rendering string (trailing control sequences dropped,
//! entity mnemonics replaced), and the derived per-character arrays the
//! tokenizer produces. Mutations mark a pipeline stage dirty and
//! [`reconstruct`](TextField::reconstruct) re-runs exactly the invalidated
//! stages:
//!
//! 1. `TEXT` — tokenize into paragraphs, runs, and words
//!    ([`paragraph`](crate::paragraph)).
//! 2. `POSITIONS` — break lines and place characters
//!    ([`layout`](crate::layout)).
//! 3. `GLYPHS` — rebuild or reposition glyph batches
//!    ([`glyphs`](crate::glyphs)).
//! 4. `SHAPES` — refresh cursor and selection geometry
//!    ([`input`](crate::input)).

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::Rect;

use crate::format::{AutoSize, FieldType, TextFormat, TextFormatUpdate};
use crate::glyphs::GlyphBatch;
use crate::restrict::Restrict;
use crate::word::WordStore;

bitflags! {
    /// Dirty stages of the rebuild pipeline.
    ///
    /// The first four flags form a strict precedence chain — marking an
    /// earlier one implies all later ones (see [`LayoutDirty::mark`]).
    /// `BATCHES` is the independent change signal computed by the
    /// tokenizer: it controls whether glyph batches are regrouped from
    /// scratch or only repositioned.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct LayoutDirty: u8 {
        /// Text content changed; everything below must re-run.
        const TEXT = 1 << 0;
        /// Formatting or geometry changed; lines must be re-placed.
        const POSITIONS = 1 << 1;
        /// Glyph batches must be rebuilt or repositioned.
        const GLYPHS = 1 << 2;
        /// Cursor/selection geometry must be refreshed.
        const SHAPES = 1 << 3;
        /// Per-character codes/formats/widths actually differ from the
        /// previous pass — batches must be regrouped, not just moved.
        const BATCHES = 1 << 4;
    }
}

impl LayoutDirty {
    /// Marks `stage` and every stage after it in the precedence chain.
    pub fn mark(&mut self, stage: Self) {
        let mut s = stage;
        if s.contains(Self::TEXT) {
            s |= Self::POSITIONS | Self::GLYPHS | Self::SHAPES;
        } else if s.contains(Self::POSITIONS) {
            s |= Self::GLYPHS | Self::SHAPES;
        } else if s.contains(Self::GLYPHS) {
            s |= Self::SHAPES;
        }
        *self |= s;
    }
}

/// One format-homogeneous run: a span of words sharing a format.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RunEntry {
    /// Index of the run's first word in the word store.
    pub(crate) start: usize,
    /// Number of words in the run.
    pub(crate) count: usize,
    /// Summed advance of the run's characters.
    pub(crate) width: f64,
    /// Number of whitespace words in the run.
    pub(crate) space: usize,
}

/// Per-line geometry tables, parallel by line index.
#[derive(Clone, Debug, Default)]
pub(crate) struct LineTable {
    pub(crate) word_start: Vec<usize>,
    pub(crate) word_end: Vec<usize>,
    pub(crate) start_x: Vec<f64>,
    pub(crate) start_y: Vec<f64>,
    pub(crate) char_start: Vec<usize>,
    pub(crate) char_end: Vec<usize>,
    pub(crate) width: Vec<f64>,
    pub(crate) height: Vec<f64>,
    pub(crate) spaces: Vec<usize>,
}

impl LineTable {
    pub(crate) fn len(&self) -> usize {
        self.word_start.len()
    }

    pub(crate) fn clear(&mut self) {
        self.word_start.clear();
        self.word_end.clear();
        self.start_x.clear();
        self.start_y.clear();
        self.char_start.clear();
        self.char_end.clear();
        self.width.clear();
        self.height.clear();
        self.spaces.clear();
    }
}

/// Metrics for one laid-out line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineMetrics {
    /// Line origin x.
    pub x: f64,
    /// Line origin y.
    pub y: f64,
    /// Summed advance of the line's characters.
    pub width: f64,
    /// Line height (tallest format on the line, plus leading).
    pub height: f64,
    /// Whitespace words on the line.
    pub space_count: usize,
}

/// A Flash-style text display and input field.
///
/// The field is a pure layout/editing state machine: it consumes font
/// metrics and produces character positions, glyph batches, and
/// cursor/selection rectangles. Rendering, focus routing, and the display
/// tree are the owner's concern.
#[derive(Clone, Debug)]
pub struct TextField {
    // -- Configuration --
    pub(crate) width: f64,
    pub(crate) height: f64,
    /// Layout-space x origin of the text box.
    pub text_offset_x: f64,
    /// Layout-space y origin of the text box.
    pub text_offset_y: f64,
    pub(crate) auto_size: AutoSize,
    pub(crate) word_wrap: bool,
    pub(crate) multiline: bool,
    pub(crate) field_type: FieldType,
    pub(crate) selectable: bool,
    /// Whether a border is drawn around the field box.
    pub border: bool,
    /// Whether the field box is filled with `background_color`.
    pub background: bool,
    /// 0xRRGGBB border color.
    pub border_color: u32,
    /// 0xRRGGBB background color.
    pub background_color: u32,
    pub(crate) max_chars: usize,
    pub(crate) restrict: Option<Restrict>,

    // -- Text state --
    pub(crate) text: String,
    pub(crate) render_text: String,
    pub(crate) render_chars: Vec<char>,
    pub(crate) plain_text: String,

    // -- Formats --
    pub(crate) format: TextFormat,
    pub(crate) new_format: Option<TextFormat>,
    pub(crate) formats: Vec<Rc<TextFormat>>,
    /// End offsets (in characters) of each format span; strictly increasing.
    pub(crate) format_bounds: Vec<usize>,

    // -- Tokenizer output --
    pub(crate) char_codes: Vec<char>,
    pub(crate) char_widths: Vec<f64>,
    pub(crate) char_formats: Vec<Rc<TextFormat>>,
    pub(crate) words: WordStore,
    pub(crate) runs: Vec<RunEntry>,
    pub(crate) run_formats: Vec<Rc<TextFormat>>,
    pub(crate) paragraph_run_indices: Vec<usize>,
    pub(crate) max_width_line: f64,

    // -- Positioner output --
    pub(crate) lines: LineTable,
    pub(crate) char_positions_x: Vec<f64>,
    pub(crate) char_positions_y: Vec<f64>,
    pub(crate) text_width: f64,
    pub(crate) text_height: f64,
    pub(crate) biggest_line: usize,
    pub(crate) max_scroll_h: usize,
    pub(crate) max_scroll_v: usize,
    pub(crate) scroll_h: usize,
    pub(crate) scroll_v: usize,

    // -- Selection and focus --
    pub(crate) selection_begin: usize,
    pub(crate) selection_end: usize,
    pub(crate) in_focus: bool,
    /// Cursor blink phase; `true` hides the cursor.
    pub cursor_blinking: bool,
    pub(crate) show_selection: bool,
    pub(crate) cursor_rect: Option<Rect>,
    pub(crate) selection_rects: Vec<Rect>,

    // -- Pipeline --
    pub(crate) dirty: LayoutDirty,
    pub(crate) last_words_count: usize,
    pub(crate) batches: Vec<GlyphBatch>,

    // -- Auto-size position feedback --
    pub(crate) pending_position_shift: f64,

    // -- Clone support --
    pub(crate) source: Option<Rc<TextField>>,
}

impl TextField {
    /// Creates an empty dynamic field with the given base format and a
    /// 100×100 box.
    #[must_use]
    pub fn new(format: TextFormat) -> Self {
        Self {
            width: 100.0,
            height: 100.0,
            text_offset_x: 0.0,
            text_offset_y: 0.0,
            auto_size: AutoSize::None,
            word_wrap: false,
            multiline: false,
            field_type: FieldType::Dynamic,
            selectable: true,
            border: false,
            background: false,
            border_color: 0x00_0000,
            background_color: 0xFF_FFFF,
            max_chars: 0,
            restrict: None,
            text: String::new(),
            render_text: String::new(),
            render_chars: Vec::new(),
            plain_text: String::new(),
            format,
            new_format: None,
            formats: Vec::new(),
            format_bounds: Vec::new(),
            char_codes: Vec::new(),
            char_widths: Vec::new(),
            char_formats: Vec::new(),
            words: WordStore::default(),
            runs: Vec::new(),
            run_formats: Vec::new(),
            paragraph_run_indices: Vec::new(),
            max_width_line: 0.0,
            lines: LineTable::default(),
            char_positions_x: Vec::new(),
            char_positions_y: Vec::new(),
            text_width: 0.0,
            text_height: 0.0,
            biggest_line: 0,
            max_scroll_h: 0,
            max_scroll_v: 0,
            scroll_h: 0,
            scroll_v: 0,
            selection_begin: 0,
            selection_end: 0,
            in_focus: false,
            cursor_blinking: false,
            show_selection: false,
            cursor_rect: None,
            selection_rects: Vec::new(),
            dirty: LayoutDirty::empty(),
            last_words_count: 0,
            batches: Vec::new(),
            pending_position_shift: 0.0,
            source: None,
        }
    }

    // -- Text access ------------------------------------------------------

    /// Returns the raw text as assigned.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the rendering string (trailing control sequences dropped).
    #[must_use]
    pub fn render_text(&self) -> &str {
        &self.render_text
    }

    /// Number of characters in the rendering string.
    #[must_use]
    pub fn len(&self) -> usize {
        self.render_chars.len()
    }

    /// Whether the rendering string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.render_chars.is_empty()
    }

    /// Assigns the field's text, resetting formatting to a single run of
    /// the default new-text format.
    ///
    /// Non-breaking spaces are normalized to plain spaces; a single
    /// trailing CR/LF or escaped-`\n` sequence is dropped from the
    /// rendering string; `&apos;`/`&gt;` mnemonics are replaced.
    pub fn set_text(&mut self, value: &str) {
        let value: String = value
            .chars()
            .map(|c| if c == '\u{a0}' { ' ' } else { c })
            .collect();
        if self.text == value {
            return;
        }
        self.assign_text(value);
    }

    /// The body of [`set_text`](Self::set_text), without the no-change
    /// early-out. Used when restoring pristine state onto a mutated field.
    pub(crate) fn assign_text(&mut self, value: String) {
        self.text = value.clone();

        let mut v: Vec<char> = value.chars().collect();
        if matches!(v.last(), Some('\r' | '\n')) {
            v.pop();
        }
        let n = v.len();
        if n >= 3 && v[n - 1] == 'n' && v[n - 2] == '\\' && v[n - 3] == '\\' {
            v.truncate(n - 3);
        } else if n >= 2 && v[n - 1] == 'n' && v[n - 2] == '\\' {
            v.truncate(n - 2);
        }

        let s: String = v.iter().collect();
        let s = s.replace("&apos;", "'").replace("&gt;", ">");
        self.install_render_text(s);
    }

    /// Assigns HTML-formatted text.
    ///
    /// Only structural markup is honored: `<br>` and paragraph closes become
    /// line breaks, every other tag is stripped, and the common entities are
    /// decoded. Styling attributes are ignored.
    pub fn set_html_text(&mut self, value: &str) {
        let mut out = String::new();
        let mut chars = value.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '<' {
                let mut tag = String::new();
                for t in chars.by_ref() {
                    if t == '>' {
                        break;
                    }
                    tag.push(t);
                }
                let tag = tag.trim().to_ascii_lowercase();
                if tag == "br" || tag == "br/" || tag == "br /" || tag == "/p" {
                    out.push('\n');
                }
            } else {
                out.push(c);
            }
        }
        let out = out
            .replace("&amp;", "&")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&apos;", "'")
            .replace("&quot;", "\"")
            .replace("&nbsp;", " ");
        self.set_text(&out);
    }

    /// Appends to the rendering string. Existing format runs are kept; the
    /// appended tail renders with the last run's format.
    pub fn append_text(&mut self, new_text: &str) {
        if new_text.is_empty() {
            return;
        }
        let mut s = self.render_text.clone();
        s.push_str(new_text);
        self.extend_render_text(s);
    }

    /// Closes the current paragraph: future appended text starts a new line.
    pub fn close_paragraph(&mut self) {
        let mut s = self.render_text.clone();
        s.push('\n');
        self.extend_render_text(s);
    }

    /// Installs a longer rendering string without resetting the format-run
    /// table. The last span's end offset implicitly tracks the text length.
    fn extend_render_text(&mut self, s: String) {
        self.render_chars = s.chars().collect();
        self.render_text = s;
        self.plain_text = strip_line_breaks(&self.render_chars);
        if self.formats.is_empty() {
            let base = self.new_format_value();
            self.formats = vec![Rc::new(base)];
            self.format_bounds = vec![self.render_chars.len()];
        } else if let Some(last) = self.format_bounds.last_mut() {
            *last = self.render_chars.len();
        }
        self.dirty.mark(LayoutDirty::TEXT);
    }

    /// Replaces the character range `[begin, end)` with `new_text`.
    ///
    /// Indices are clamped to the text length.
    pub fn replace_text(&mut self, begin: usize, end: usize, new_text: &str) {
        let n = self.render_chars.len();
        let begin = begin.min(n);
        let end = end.clamp(begin, n);
        let mut s: String = self.render_chars[..begin].iter().collect();
        s.push_str(new_text);
        s.extend(&self.render_chars[end..]);
        self.install_render_text(s);
        self.selection_begin = begin;
        self.selection_end = begin + new_text.chars().count();
    }

    /// Installs a new rendering string and resets derived state.
    pub(crate) fn install_render_text(&mut self, s: String) {
        self.render_chars = s.chars().collect();
        self.render_text = s;
        self.plain_text = strip_line_breaks(&self.render_chars);
        let base = self.new_format_value();
        self.formats = vec![Rc::new(base)];
        self.format_bounds = vec![self.render_chars.len()];
        self.dirty.mark(LayoutDirty::TEXT);
    }

    // -- Formats ----------------------------------------------------------

    /// Returns the base text format.
    #[must_use]
    pub fn text_format(&self) -> &TextFormat {
        &self.format
    }

    /// Replaces the base text format for the whole field.
    pub fn set_text_format(&mut self, format: TextFormat) {
        self.format = format;
        let base = self.new_format_value();
        self.formats = vec![Rc::new(base)];
        self.format_bounds = vec![self.render_chars.len()];
        self.dirty.mark(LayoutDirty::TEXT);
        self.dirty |= LayoutDirty::BATCHES;
    }

    /// Format applied to newly typed or inserted text.
    #[must_use]
    pub fn new_text_format(&self) -> TextFormat {
        self.new_format.clone().unwrap_or_else(|| self.format.clone())
    }

    /// Sets the format for newly typed text as a delta over the base format.
    pub fn set_new_text_format(&mut self, update: &TextFormatUpdate) {
        let mut fmt = self.format.clone();
        update.apply_to(&mut fmt);
        self.new_format = Some(fmt);
    }

    pub(crate) fn new_format_value(&self) -> TextFormat {
        self.new_format.clone().unwrap_or_else(|| self.format.clone())
    }

    /// Applies `update` to the character range `[begin, end)`, splitting
    /// format spans as needed. Negative-free: pass `None` bounds to cover
    /// the whole text.
    ///
    /// Does nothing when the field holds no text.
    pub fn set_text_format_range(
        &mut self,
        update: &TextFormatUpdate,
        begin: Option<usize>,
        end: Option<usize>,
    ) {
        let text_len = self.render_chars.len();
        if text_len == 0 {
            return;
        }
        let mut begin = begin.unwrap_or(0).min(text_len);
        let mut end = end.unwrap_or(text_len).min(text_len);
        if end < begin {
            core::mem::swap(&mut begin, &mut end);
        }
        if end == begin {
            end += 1;
        }

        if begin == 0 && end >= text_len {
            // Whole-text fast path: merge into every existing span.
            let mut changed = false;
            for fmt in &mut self.formats {
                let mut merged = (**fmt).clone();
                update.apply_to(&mut merged);
                if !merged.visual_eq(fmt) {
                    *fmt = Rc::new(merged);
                    changed = true;
                }
            }
            if changed {
                self.dirty.mark(LayoutDirty::TEXT);
                self.dirty |= LayoutDirty::BATCHES;
            }
            return;
        }

        // Split spans intersecting [begin, end).
        let mut new_formats = Vec::new();
        let mut new_bounds = Vec::new();
        let mut seg_start = 0;
        for (fmt, &seg_end) in self.formats.iter().zip(&self.format_bounds) {
            if seg_end <= begin || seg_start >= end {
                new_formats.push(fmt.clone());
                new_bounds.push(seg_end);
            } else {
                if seg_start < begin {
                    new_formats.push(fmt.clone());
                    new_bounds.push(begin);
                }
                let mut merged = (**fmt).clone();
                update.apply_to(&mut merged);
                new_formats.push(Rc::new(merged));
                new_bounds.push(seg_end.min(end));
                if seg_end > end {
                    new_formats.push(fmt.clone());
                    new_bounds.push(seg_end);
                }
            }
            seg_start = seg_end;
        }
        self.formats = new_formats;
        self.format_bounds = new_bounds;
        self.dirty.mark(LayoutDirty::TEXT);
        self.dirty |= LayoutDirty::BATCHES;
    }

    // -- Box geometry and behavior flags ----------------------------------

    /// Field box width.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Sets the field box width.
    pub fn set_width(&mut self, value: f64) {
        if self.width != value {
            self.width = value;
            self.dirty.mark(LayoutDirty::TEXT);
        }
    }

    /// Field box height.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Sets the field box height.
    pub fn set_height(&mut self, value: f64) {
        if self.height != value {
            self.height = value;
            self.dirty.mark(LayoutDirty::POSITIONS);
        }
    }

    /// Automatic sizing mode.
    #[must_use]
    pub fn auto_size(&self) -> AutoSize {
        self.auto_size
    }

    /// Sets the automatic sizing mode.
    pub fn set_auto_size(&mut self, value: AutoSize) {
        if self.auto_size != value {
            self.auto_size = value;
            self.dirty.mark(LayoutDirty::TEXT);
        }
    }

    /// Whether words wrap at the field width.
    #[must_use]
    pub fn word_wrap(&self) -> bool {
        self.word_wrap
    }

    /// Enables or disables word wrapping.
    pub fn set_word_wrap(&mut self, value: bool) {
        if self.word_wrap != value {
            self.word_wrap = value;
            self.dirty.mark(LayoutDirty::TEXT);
        }
    }

    /// Whether the field accepts line breaks from input.
    #[must_use]
    pub fn multiline(&self) -> bool {
        self.multiline
    }

    /// Sets whether the field accepts line breaks from input.
    pub fn set_multiline(&mut self, value: bool) {
        self.multiline = value;
    }

    /// Dynamic or input behavior.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Sets dynamic or input behavior.
    pub fn set_field_type(&mut self, value: FieldType) {
        if self.field_type != value {
            self.field_type = value;
            self.dirty.mark(LayoutDirty::POSITIONS);
        }
    }

    /// Whether the text can be selected.
    #[must_use]
    pub fn selectable(&self) -> bool {
        self.selectable
    }

    /// Sets whether the text can be selected.
    pub fn set_selectable(&mut self, value: bool) {
        self.selectable = value;
    }

    /// Maximum characters the field accepts from input (0 = unlimited).
    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Sets the input length cap (0 = unlimited).
    pub fn set_max_chars(&mut self, value: usize) {
        self.max_chars = value;
    }

    /// The input character allow-list, if any.
    #[must_use]
    pub fn restrict(&self) -> Option<&Restrict> {
        self.restrict.as_ref()
    }

    /// Sets the input character allow-list from a Flash `restrict` pattern.
    /// `None` removes the filter.
    pub fn set_restrict(&mut self, pattern: Option<&str>) {
        self.restrict = pattern.map(Restrict::parse);
    }

    // -- Layout results ----------------------------------------------------

    /// Widest laid-out line.
    #[must_use]
    pub fn text_width(&self) -> f64 {
        self.text_width
    }

    /// Summed height of all laid-out lines.
    #[must_use]
    pub fn text_height(&self) -> f64 {
        self.text_height
    }

    /// Number of laid-out lines.
    #[must_use]
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Accumulated auto-size position shift since the last take.
    ///
    /// Center/right auto-size growth moves the field's anchor; the owner
    /// applies this to the node transform.
    pub fn take_position_shift(&mut self) -> f64 {
        core::mem::take(&mut self.pending_position_shift)
    }

    /// Glyph batches produced by the last `GLYPHS` stage.
    #[must_use]
    pub fn glyph_batches(&self) -> &[GlyphBatch] {
        &self.batches
    }

    /// Cursor rectangle, when the field shows an insertion point.
    #[must_use]
    pub fn cursor_rect(&self) -> Option<Rect> {
        self.cursor_rect
    }

    /// Selection highlight rectangles, one per touched line.
    #[must_use]
    pub fn selection_rects(&self) -> &[Rect] {
        &self.selection_rects
    }

    // -- Scrolling ---------------------------------------------------------

    /// Horizontal scroll position, in characters.
    #[must_use]
    pub fn scroll_h(&self) -> usize {
        self.scroll_h
    }

    /// Sets the horizontal scroll position, clamped to `max_scroll_h`.
    pub fn set_scroll_h(&mut self, value: usize) {
        self.scroll_h = value.min(self.max_scroll_h);
    }

    /// Vertical scroll position, in lines.
    #[must_use]
    pub fn scroll_v(&self) -> usize {
        self.scroll_v
    }

    /// Sets the vertical scroll position, clamped to `max_scroll_v`.
    pub fn set_scroll_v(&mut self, value: usize) {
        self.scroll_v = value.min(self.max_scroll_v);
    }

    /// Largest valid horizontal scroll position.
    #[must_use]
    pub fn max_scroll_h(&self) -> usize {
        self.max_scroll_h
    }

    /// Largest valid vertical scroll position.
    #[must_use]
    pub fn max_scroll_v(&self) -> usize {
        self.max_scroll_v
    }

    /// Index one past the last fully visible line at the current scroll.
    #[must_use]
    pub fn bottom_scroll_v(&self) -> usize {
        let mut l = self.scroll_v;
        let mut h = 0.0;
        while l < self.lines.len() && h + self.lines.height[l] <= self.height {
            h += self.lines.height[l];
            l += 1;
        }
        l
    }

    // -- Pipeline ----------------------------------------------------------

    /// Returns the current dirty stages.
    #[must_use]
    pub fn dirty(&self) -> LayoutDirty {
        self.dirty
    }

    /// Marks a pipeline stage (and its downstream stages) dirty.
    pub fn mark_dirty(&mut self, stage: LayoutDirty) {
        self.dirty.mark(stage);
    }

    /// Re-runs the invalidated pipeline stages.
    ///
    /// With `build_graphics` false only the data stages run (tokenize and
    /// position); glyph batches and cursor/selection geometry are deferred
    /// until the renderer actually collects the field.
    pub fn reconstruct(&mut self, build_graphics: bool) {
        if !self
            .dirty
            .intersects(LayoutDirty::TEXT | LayoutDirty::POSITIONS | LayoutDirty::GLYPHS | LayoutDirty::SHAPES)
        {
            return;
        }

        let text_was_dirty = self.dirty.contains(LayoutDirty::TEXT);
        if text_was_dirty {
            self.dirty.mark(LayoutDirty::POSITIONS);
            self.last_words_count = self.words.len();
            self.char_positions_x.clear();
            self.char_positions_y.clear();
            self.words.rewind();
            self.lines.clear();
            self.max_scroll_h = 0;
            self.max_scroll_v = 0;
            self.max_width_line = 0.0;
            self.build_paragraphs();
        }

        if self.dirty.contains(LayoutDirty::POSITIONS) {
            self.dirty.mark(LayoutDirty::GLYPHS);
            if self.render_chars.is_empty() {
                self.reset_empty_layout();
            } else {
                self.position_words(text_was_dirty);
            }
        }

        self.dirty.remove(LayoutDirty::TEXT | LayoutDirty::POSITIONS);
        if !build_graphics {
            return;
        }

        if self.dirty.contains(LayoutDirty::GLYPHS) {
            self.build_glyph_batches();
        }
        self.dirty.remove(LayoutDirty::GLYPHS);

        self.update_selection_geometry();
        self.dirty.remove(LayoutDirty::SHAPES);
    }

    /// Layout results for an empty rendering string.
    fn reset_empty_layout(&mut self) {
        self.text_width = 0.0;
        self.text_height = 0.0;
        self.lines.clear();
        if self.auto_size != AutoSize::None {
            if !self.word_wrap {
                self.adjust_position_for_auto_size(0.0);
            }
            self.height = 4.0;
            if self.field_type == FieldType::Input {
                let fmt = self.new_format_value();
                self.height = fmt.font.line_height(fmt.size) + 4.0;
            }
        }
    }

    /// Grows/shrinks the field width under auto-size and records the anchor
    /// shift for center/right growth.
    pub(crate) fn adjust_position_for_auto_size(&mut self, new_width: f64) {
        let old = self.width;
        self.width = 4.0 + new_width;
        match self.auto_size {
            AutoSize::Right => self.pending_position_shift -= self.width - old,
            AutoSize::Center => self.pending_position_shift -= (self.width - old) / 2.0,
            AutoSize::Left | AutoSize::None => {}
        }
    }

    // -- Metrics queries ---------------------------------------------------

    /// Bounding box of the character at `index`, if laid out.
    #[must_use]
    pub fn char_boundaries(&self, index: usize) -> Option<Rect> {
        if index >= self.char_positions_x.len() {
            return None;
        }
        let x = self.char_positions_x[index];
        let y = self.char_positions_y[index];
        let w = self.char_widths[index];
        let h = self.char_formats[index].line_height();
        Some(Rect::new(x, y, x + w, y + h))
    }

    /// Line containing the point, by y. Points past the last line resolve
    /// to it.
    #[must_use]
    pub fn line_index_at_point(&self, _x: f64, y: f64) -> usize {
        let len = self.lines.len();
        if len == 0 {
            return 0;
        }
        for i in 0..len - 1 {
            if y >= self.lines.start_y[i] && y <= self.lines.start_y[i + 1] {
                return i;
            }
        }
        if y >= self.lines.start_y[len - 1] {
            return len - 1;
        }
        0
    }

    /// Character whose box contains the x on the given line. The left half
    /// of a glyph resolves to its index, the right half to the next.
    #[must_use]
    pub fn char_index_at_point(&self, x: f64, y: f64, line: Option<usize>) -> Option<usize> {
        let line = line.unwrap_or_else(|| self.line_index_at_point(x, y));
        if line >= self.lines.len() {
            return None;
        }
        let start = self.lines.char_start[line];
        let end = self.lines.char_end[line];
        for i in start..end {
            if x >= self.char_positions_x[i] {
                if x <= self.char_positions_x[i] + self.char_widths[i] / 2.0 {
                    return Some(i);
                } else if x <= self.char_positions_x[i] + self.char_widths[i] {
                    return Some(i + 1);
                }
            }
        }
        None
    }

    /// Line containing the character at `index`.
    #[must_use]
    pub fn line_index_of_char(&self, index: usize) -> usize {
        let len = self.lines.len();
        for l in 0..len {
            if index >= self.lines.char_start[l] && index < self.lines.char_end[l] {
                return l;
            }
        }
        len.saturating_sub(1)
    }

    /// Summed character advance of a line. Out-of-range indices resolve to
    /// the last line; an empty field reports zero.
    #[must_use]
    pub fn line_length(&self, line: usize) -> f64 {
        if self.lines.len() == 0 {
            return 0.0;
        }
        let line = line.min(self.lines.len() - 1);
        self.lines.width[line]
    }

    /// Character offset of a line's first character.
    #[must_use]
    pub fn line_offset(&self, line: usize) -> usize {
        if self.lines.len() == 0 {
            return 0;
        }
        let line = line.min(self.lines.len() - 1);
        self.lines.char_start[line]
    }

    /// Text content of a line.
    #[must_use]
    pub fn line_text(&self, line: usize) -> String {
        if line >= self.lines.len() {
            return String::new();
        }
        self.char_codes[self.lines.char_start[line]..self.lines.char_end[line]]
            .iter()
            .collect()
    }

    /// Geometry metrics of a line, if laid out.
    #[must_use]
    pub fn line_metrics(&self, line: usize) -> Option<LineMetrics> {
        if line >= self.lines.len() {
            return None;
        }
        Some(LineMetrics {
            x: self.lines.start_x[line],
            y: self.lines.start_y[line],
            width: self.lines.width[line],
            height: self.lines.height[line],
            space_count: self.lines.spaces[line],
        })
    }

    /// Character range `[start, end)` of the paragraph containing `index`.
    #[must_use]
    pub fn paragraph_char_range(&self, index: usize) -> (usize, usize) {
        let p_len = self.paragraph_run_indices.len();
        if p_len == 0 || self.words.is_empty() {
            return (0, 0);
        }
        for p in 0..p_len {
            let (start, end) = self.paragraph_bounds(p);
            if index >= start && index < end {
                return (start, end);
            }
        }
        self.paragraph_bounds(p_len - 1)
    }

    /// Number of characters in the paragraph containing `index`.
    #[must_use]
    pub fn paragraph_length(&self, index: usize) -> usize {
        let (start, end) = self.paragraph_char_range(index);
        end - start
    }

    /// Index of the first character of the paragraph containing `index`.
    #[must_use]
    pub fn first_char_in_paragraph(&self, index: usize) -> usize {
        self.paragraph_char_range(index).0
    }

    fn paragraph_bounds(&self, p: usize) -> (usize, usize) {
        let run_start = self.paragraph_run_indices[p];
        let run_end = if p + 1 < self.paragraph_run_indices.len() {
            self.paragraph_run_indices[p + 1]
        } else {
            self.runs.len()
        };
        let mut start = None;
        let mut end = 0;
        for run in &self.runs[run_start..run_end] {
            if run.count == 0 {
                continue;
            }
            let first_word = self.words.get(run.start);
            let last_word = self.words.get(run.start + run.count - 1);
            start.get_or_insert(first_word.start);
            end = last_word.start + last_word.len;
        }
        (start.unwrap_or(0), end)
    }

    // -- Focus -------------------------------------------------------------

    /// Whether the field currently has keyboard focus.
    #[must_use]
    pub fn in_focus(&self) -> bool {
        self.in_focus
    }

    /// Grants or removes keyboard focus. Collapses the selection to the
    /// text start on every transition.
    pub fn set_focus(&mut self, value: bool) {
        if self.in_focus == value {
            return;
        }
        self.in_focus = value;
        if !self.selectable {
            return;
        }
        self.set_selection(0, 0);
        self.dirty.mark(LayoutDirty::GLYPHS);
    }

    /// Advances the cursor blink phase.
    pub fn blink_cursor(&mut self) {
        self.cursor_blinking = !self.cursor_blinking;
        if !self.selectable {
            self.cursor_blinking = true;
        }
        self.dirty.mark(LayoutDirty::SHAPES);
    }

    // -- Clone / reset -----------------------------------------------------

    /// Copies configuration, formatting, and text onto `target` and points
    /// `target` back at a pristine snapshot of `self` so a later
    /// [`reset`](Self::reset) restores this state.
    pub fn copy_to(&self, target: &mut Self) {
        target.width = self.width;
        target.height = self.height;
        target.text_offset_x = self.text_offset_x;
        target.text_offset_y = self.text_offset_y;
        target.auto_size = self.auto_size;
        target.word_wrap = self.word_wrap;
        target.multiline = self.multiline;
        target.field_type = self.field_type;
        target.selectable = self.selectable;
        target.border = self.border;
        target.background = self.background;
        target.border_color = self.border_color;
        target.background_color = self.background_color;
        target.max_chars = self.max_chars;
        target.restrict = self.restrict.clone();
        target.format = self.format.clone();
        target.new_format = self.new_format.clone();
        target.assign_text(self.text.clone());
        target.source = Some(Rc::new(self.pristine()));
    }

    /// Returns a new field with this field's configuration and text,
    /// pointing back at `self` for reset.
    #[must_use]
    pub fn clone_field(&self) -> Self {
        let mut out = Self::new(self.format.clone());
        self.copy_to(&mut out);
        out
    }

    /// Restores the pristine state captured when this field was cloned.
    /// Fields that were not produced by [`clone_field`](Self::clone_field)
    /// are left untouched.
    pub fn reset(&mut self) {
        if let Some(source) = self.source.clone() {
            source.copy_to(self);
            // Keep pointing at the original snapshot, not a fresh one.
            self.source = Some(source);
        }
    }

    fn pristine(&self) -> Self {
        let mut snap = Self::new(self.format.clone());
        snap.width = self.width;
        snap.height = self.height;
        snap.text_offset_x = self.text_offset_x;
        snap.text_offset_y = self.text_offset_y;
        snap.auto_size = self.auto_size;
        snap.word_wrap = self.word_wrap;
        snap.multiline = self.multiline;
        snap.field_type = self.field_type;
        snap.selectable = self.selectable;
        snap.border = self.border;
        snap.background = self.background;
        snap.border_color = self.border_color;
        snap.background_color = self.background_color;
        snap.max_chars = self.max_chars;
        snap.restrict = self.restrict.clone();
        snap.new_format = self.new_format.clone();
        snap.set_text(&self.text);
        snap
    }
}

/// Strips CR, LF, and literal `\n` escape pairs from the character stream.
fn strip_line_breaks(chars: &[char]) -> String {
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\r' || c == '\n' {
            i += 1;
            continue;
        }
        if c == '\\' && i + 1 < chars.len() && (chars[i + 1] == 'n' || chars[i + 1] == 'r') {
            i += 2;
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::MetricsTable;

    fn field() -> TextField {
        let font = Rc::new(MetricsTable::monospace(10.0, 10.0, 12.0));
        TextField::new(TextFormat::new(font, 10.0, 0))
    }

    #[test]
    fn mark_text_implies_all_later_stages() {
        let mut dirty = LayoutDirty::empty();
        dirty.mark(LayoutDirty::TEXT);
        assert!(dirty.contains(
            LayoutDirty::TEXT | LayoutDirty::POSITIONS | LayoutDirty::GLYPHS | LayoutDirty::SHAPES
        ));
    }

    #[test]
    fn mark_later_stage_alone_leaves_earlier_clean() {
        let mut dirty = LayoutDirty::empty();
        dirty.mark(LayoutDirty::GLYPHS);
        assert!(dirty.contains(LayoutDirty::GLYPHS | LayoutDirty::SHAPES));
        assert!(!dirty.contains(LayoutDirty::TEXT));
        assert!(!dirty.contains(LayoutDirty::POSITIONS));
    }

    #[test]
    fn set_text_round_trips() {
        let mut f = field();
        f.set_text("Hello World");
        assert_eq!(f.text(), "Hello World");
        assert_eq!(f.render_text(), "Hello World");
    }

    #[test]
    fn set_text_drops_trailing_line_break_from_render_only() {
        let mut f = field();
        f.set_text("abc\n");
        assert_eq!(f.text(), "abc\n");
        assert_eq!(f.render_text(), "abc");
    }

    #[test]
    fn set_text_drops_trailing_escaped_newline() {
        let mut f = field();
        f.set_text("abc\\n");
        assert_eq!(f.render_text(), "abc");
    }

    #[test]
    fn set_text_normalizes_nbsp_and_mnemonics() {
        let mut f = field();
        f.set_text("a\u{a0}b &gt; c &apos;d");
        assert_eq!(f.render_text(), "a b > c 'd");
    }

    #[test]
    fn html_text_strips_tags_and_breaks() {
        let mut f = field();
        f.set_html_text("<p>first</p><p>second &amp; third<br>fourth</p>");
        assert_eq!(f.render_text(), "first\nsecond & third\nfourth");
    }

    #[test]
    fn append_text_marks_text_dirty() {
        let mut f = field();
        f.set_text("ab");
        f.reconstruct(false);
        assert!(!f.dirty().contains(LayoutDirty::TEXT));
        f.append_text("cd");
        assert!(f.dirty().contains(LayoutDirty::TEXT));
        assert_eq!(f.render_text(), "abcd");
    }

    #[test]
    fn close_paragraph_appends_line_break() {
        let mut f = field();
        f.set_text("ab");
        f.close_paragraph();
        f.append_text("cd");
        assert_eq!(f.render_text(), "ab\ncd");
    }

    #[test]
    fn replace_text_clamps_and_sets_selection() {
        let mut f = field();
        f.set_text("abcdef");
        f.replace_text(2, 4, "XY");
        assert_eq!(f.render_text(), "abXYef");
        assert_eq!(f.selection_begin, 2);
        assert_eq!(f.selection_end, 4);
        f.replace_text(100, 200, "Z");
        assert_eq!(f.render_text(), "abXYefZ");
    }

    #[test]
    fn format_range_splits_spans() {
        let mut f = field();
        f.set_text("abcdef");
        let update = TextFormatUpdate {
            color: Some(0xFF_0000),
            ..TextFormatUpdate::default()
        };
        f.set_text_format_range(&update, Some(2), Some(4));
        assert_eq!(f.formats.len(), 3);
        assert_eq!(f.format_bounds, alloc::vec![2, 4, 6]);
        assert_eq!(f.formats[1].color, 0xFF_0000);
        assert_eq!(f.formats[0].color, 0);
        assert_eq!(f.formats[2].color, 0);
    }

    #[test]
    fn format_range_whole_text_keeps_single_span() {
        let mut f = field();
        f.set_text("abcdef");
        let update = TextFormatUpdate {
            color: Some(0x00_FF00),
            ..TextFormatUpdate::default()
        };
        f.set_text_format_range(&update, None, None);
        assert_eq!(f.formats.len(), 1);
        assert_eq!(f.formats[0].color, 0x00_FF00);
    }

    #[test]
    fn format_range_on_empty_field_is_a_no_op() {
        let mut f = field();
        let update = TextFormatUpdate::default();
        f.set_text_format_range(&update, Some(0), Some(3));
        assert!(f.formats.is_empty());
    }

    #[test]
    fn clone_and_reset_restores_pristine_text() {
        let mut f = field();
        f.set_text("original");
        let mut c = f.clone_field();
        assert_eq!(c.text(), "original");
        c.set_text("mutated by script");
        c.reset();
        assert_eq!(c.text(), "original");
        // A second mutate/reset round still restores.
        c.set_text("again");
        c.reset();
        assert_eq!(c.text(), "original");
    }

    #[test]
    fn empty_autosize_input_field_keeps_one_line_height() {
        let mut f = field();
        f.set_field_type(FieldType::Input);
        f.set_auto_size(AutoSize::Left);
        f.set_text("x");
        f.set_text("");
        f.reconstruct(false);
        assert_eq!(f.text_width(), 0.0);
        assert_eq!(f.height(), 12.0 + 4.0);
    }
}
