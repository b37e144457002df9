// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The selection, cursor, and keyboard controller.
//!
//! Pointer coordinates resolve to character indices line-first (by y), then
//! within the line by glyph halves: the left half of a glyph's box selects
//! its index, the right half the next one. Keyboard tokens mutate the text
//! buffer through the same staged pipeline as script mutations. Edits fail
//! soft: out-of-range indices clamp, a full field swallows typing, and a
//! character the font cannot render is rejected with a log line.

use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Rect;

use crate::field::{LayoutDirty, TextField};
use crate::format::{Align, FieldType};

/// A logical keyboard token, after platform decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// A printable character.
    Char(char),
    /// Delete backward.
    Backspace,
    /// Delete forward.
    Delete,
    /// Move or shrink/extend the selection left.
    ArrowLeft,
    /// Move or shrink/extend the selection right.
    ArrowRight,
    /// Insert a line break (multiline fields only).
    Enter,
}

/// Modifier state accompanying a key token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift is held: arrows extend the selection instead of collapsing it.
    pub shift: bool,
    /// Control/Command is held: the token is a shortcut, not an edit.
    pub ctrl: bool,
    /// Alt/Option is held: the token is a shortcut, not an edit.
    pub alt: bool,
}

impl TextField {
    // -- Selection ---------------------------------------------------------

    /// Selection anchor, in characters.
    #[must_use]
    pub fn selection_begin(&self) -> usize {
        self.selection_begin
    }

    /// Selection active edge, in characters.
    #[must_use]
    pub fn selection_end(&self) -> usize {
        self.selection_end
    }

    /// Caret position: the insertion point when the selection is empty.
    #[must_use]
    pub fn caret_index(&self) -> usize {
        self.selection_begin
    }

    /// Selects `[begin, end]`. Out-of-range values clamp to
    /// `[0, char count]`; equal values set the insertion point.
    pub fn set_selection(&mut self, begin: i32, end: i32) {
        let n = self.render_chars.len();
        let begin = clamp_index(begin, n);
        let end = clamp_index(end, n);
        if self.selection_begin == begin && self.selection_end == end {
            return;
        }
        self.selection_begin = begin;
        self.selection_end = end;
        self.dirty.mark(LayoutDirty::GLYPHS);
    }

    // -- Pointer resolution ------------------------------------------------

    /// Resolves a pointer position to the character index a click there
    /// selects. Out-of-line positions snap to the nearest line boundary.
    #[must_use]
    pub fn find_char_index(&self, x: f64, y: f64) -> usize {
        if self.lines.len() == 0 {
            return 0;
        }
        let line = self
            .line_index_at_point(x, y)
            .min(self.lines.len() - 1);
        match self.char_index_at_point(x, y, Some(line)) {
            Some(idx) => idx,
            None => {
                if x <= self.lines.start_x[line] {
                    self.lines.char_start[line]
                } else {
                    self.lines.char_end[line]
                }
            }
        }
    }

    /// Begins a pointer selection: collapses to the hit character and
    /// restarts the cursor blink.
    pub fn start_selection_at(&mut self, x: f64, y: f64) {
        let idx = self.find_char_index(x, y);
        self.selection_begin = idx;
        self.selection_end = idx;
        self.cursor_blinking = false;
        self.dirty.mark(LayoutDirty::GLYPHS);
        self.dirty |= LayoutDirty::BATCHES;
    }

    /// Extends the active pointer selection to the hit character.
    pub fn update_selection_to(&mut self, x: f64, y: f64) {
        self.selection_end = self.find_char_index(x, y);
        self.dirty.mark(LayoutDirty::GLYPHS);
    }

    // -- Keyboard ----------------------------------------------------------

    /// Feeds one keyboard token. Returns whether the text changed (the
    /// caller's cue to dispatch a change notification).
    pub fn handle_key(&mut self, key: Key, mods: Modifiers) -> bool {
        if mods.ctrl || mods.alt {
            // Shortcuts (clipboard etc.) are the embedder's concern.
            return false;
        }

        let old_text = self.render_text.clone();

        // Normalize the selection so begin <= end.
        if self.selection_end < self.selection_begin {
            core::mem::swap(&mut self.selection_begin, &mut self.selection_end);
        }

        let mut edited = false;
        match key {
            Key::Backspace => {
                self.delete_selected_text(false);
                edited = true;
            }
            Key::Delete => {
                self.delete_selected_text(true);
                edited = true;
            }
            Key::ArrowRight => {
                let n = self.render_chars.len();
                if !mods.shift && self.selection_end != self.selection_begin {
                    // Collapse to the right edge.
                    self.selection_begin = self.selection_end;
                } else {
                    self.selection_end = (self.selection_end + 1).min(n);
                    if !mods.shift {
                        self.selection_begin = self.selection_end;
                    }
                }
                edited = true;
            }
            Key::ArrowLeft => {
                if !mods.shift && self.selection_end != self.selection_begin {
                    // Collapse to the left edge.
                    self.selection_end = self.selection_begin;
                } else if mods.shift {
                    self.selection_end = self.selection_end.saturating_sub(1);
                } else {
                    self.selection_begin = self.selection_begin.saturating_sub(1);
                    self.selection_end = self.selection_begin;
                }
                edited = true;
            }
            Key::Enter => {
                if self.multiline {
                    self.insert_new_text("\n");
                    edited = true;
                }
            }
            Key::Char(c) => {
                let c = match &self.restrict {
                    Some(restrict) => match restrict.resolve(c) {
                        Some(c) => c,
                        None => return false,
                    },
                    None => c,
                };
                let font = self.new_format_value().font;
                let known = font.has_char(c)
                    || font.has_char(c.to_ascii_lowercase())
                    || font.has_char(c.to_ascii_uppercase());
                if !known {
                    log::info!("char not found in font table: {c:?}");
                    return false;
                }
                let mut buf = [0_u8; 4];
                self.insert_new_text(c.encode_utf8(&mut buf));
                edited = true;
            }
        }

        if edited {
            self.dirty.mark(LayoutDirty::GLYPHS);
        }
        old_text != self.render_text
    }

    /// Deletes the selection, or one character at the caret when the
    /// selection is empty (`forward` picks the Delete direction).
    fn delete_selected_text(&mut self, forward: bool) {
        if self.render_chars.is_empty() {
            return;
        }
        let n = self.render_chars.len();
        let begin = self.selection_begin.min(n);
        let end = self.selection_end.min(n);

        if begin != end {
            let s = splice(&self.render_chars, begin, end, "");
            self.assign_text(s);
            self.selection_begin = begin;
            self.selection_end = begin;
            return;
        }

        if forward {
            if begin >= n {
                return;
            }
            let s = splice(&self.render_chars, begin, begin + 1, "");
            self.assign_text(s);
            self.selection_end = self.selection_begin;
        } else {
            if begin == 0 {
                return;
            }
            let s = splice(&self.render_chars, begin - 1, begin, "");
            self.assign_text(s);
            self.selection_begin = begin - 1;
            self.selection_end = self.selection_begin;
        }
    }

    /// Replaces the current selection with `value`, as typed text would.
    pub fn replace_selected_text(&mut self, value: &str) {
        self.insert_new_text(value);
        self.dirty.mark(LayoutDirty::GLYPHS);
    }

    /// Inserts text at the selection, honoring the `max_chars` cap by
    /// truncating the insertion rather than rejecting it.
    fn insert_new_text(&mut self, new_text: &str) {
        let n = self.render_chars.len();
        let begin = self.selection_begin.min(n);
        let end = self.selection_end.min(n).max(begin);

        let mut insert: Vec<char> = new_text.chars().collect();
        if self.max_chars > 0 {
            let kept = n - (end - begin);
            let room = self.max_chars.saturating_sub(kept);
            if room == 0 {
                return;
            }
            insert.truncate(room);
        }

        let inserted: String = insert.iter().collect();
        let s = splice(&self.render_chars, begin, end, &inserted);
        self.assign_text(s);
        self.selection_begin = begin + insert.len();
        self.selection_end = self.selection_begin;
    }

    // -- Cursor and selection geometry ------------------------------------

    /// Refreshes cursor and selection-highlight geometry from the current
    /// layout. Stored selection indices are clamped to the laid-out
    /// character count first.
    pub(crate) fn update_selection_geometry(&mut self) {
        let n = self.char_positions_x.len();
        self.selection_begin = self.selection_begin.min(n);
        self.selection_end = self.selection_end.min(n);

        if self.selection_begin == self.selection_end {
            self.show_selection = false;
            self.selection_rects.clear();
            self.draw_cursor();
        } else {
            self.show_selection = true;
            // The cursor never blinks while a range is shown.
            self.cursor_blinking = true;
            self.cursor_rect = None;
            self.draw_selection_rects();
        }
    }

    fn draw_cursor(&mut self) {
        if self.cursor_blinking || !self.selectable || self.field_type != FieldType::Input {
            return;
        }

        let n = self.char_positions_x.len();
        let (x, y, height) = if n == 0 {
            let fmt = self.new_format_value();
            let x = match fmt.align {
                Align::Right => self.text_offset_x + self.width - 2.0,
                Align::Left => self.text_offset_x + 4.0 + self.text_width,
                Align::Center | Align::Justify => {
                    self.text_offset_x + self.width / 2.0 + self.text_width / 2.0
                }
            };
            (
                x,
                self.text_offset_y + 2.0,
                fmt.font.line_height(fmt.size),
            )
        } else if self.selection_begin == n {
            let i = n - 1;
            let fmt = &self.char_formats[i];
            (
                self.char_positions_x[i] + self.char_widths[i],
                self.char_positions_y[i],
                fmt.font.line_height(fmt.size),
            )
        } else {
            let i = self.selection_begin;
            let fmt = &self.char_formats[i];
            (
                self.char_positions_x[i],
                self.char_positions_y[i],
                fmt.font.line_height(fmt.size),
            )
        };

        self.cursor_rect = Some(Rect::new(x - 0.5, y, x + 0.5, y + height));
    }

    fn draw_selection_rects(&mut self) {
        self.selection_rects.clear();
        let n = self.char_positions_x.len();
        if n == 0 {
            return;
        }

        let (start, end) = if self.selection_end < self.selection_begin {
            (self.selection_end, self.selection_begin)
        } else {
            (self.selection_begin, self.selection_end)
        };
        let end = end.min(n);

        let mut run_start_x = 0.0;
        let mut run_width = 0.0;
        let mut run_y: Option<f64> = None;
        let mut run_height = 0.0_f64;

        for i in start..end {
            let x = self.char_positions_x[i];
            let y = self.char_positions_y[i];
            let fmt = &self.char_formats[i];

            match run_y {
                None => {
                    run_start_x = x;
                    run_y = Some(y);
                }
                Some(prev_y) if prev_y != y => {
                    // Line changed: flush the previous row.
                    self.selection_rects.push(Rect::new(
                        run_start_x,
                        prev_y,
                        run_start_x + run_width,
                        prev_y + run_height,
                    ));
                    run_width = 0.0;
                    run_height = 0.0;
                    run_start_x = x;
                    run_y = Some(y);
                }
                Some(_) => {}
            }

            run_width += self.char_widths[i];
            run_height = run_height.max(fmt.font.line_height(fmt.size));
        }

        if run_width > 0.0
            && let Some(y) = run_y
        {
            self.selection_rects.push(Rect::new(
                run_start_x,
                y,
                run_start_x + run_width,
                y + run_height,
            ));
        }
    }
}

/// Replaces the char range `[begin, end)` with `insert`.
fn splice(chars: &[char], begin: usize, end: usize, insert: &str) -> String {
    let mut s: String = chars[..begin].iter().collect();
    s.push_str(insert);
    s.extend(&chars[end..]);
    s
}

fn clamp_index(value: i32, len: usize) -> usize {
    if value < 0 {
        0
    } else {
        (value as usize).min(len)
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;

    use super::{Key, Modifiers};
    use crate::field::TextField;
    use crate::font::MetricsTable;
    use crate::format::{FieldType, TextFormat};

    fn input_field() -> TextField {
        let font = Rc::new(MetricsTable::monospace(10.0, 10.0, 12.0));
        let mut f = TextField::new(TextFormat::new(font, 10.0, 0));
        f.set_field_type(FieldType::Input);
        f
    }

    fn type_str(f: &mut TextField, s: &str) {
        for c in s.chars() {
            f.handle_key(Key::Char(c), Modifiers::default());
        }
    }

    #[test]
    fn typing_inserts_at_caret() {
        let mut f = input_field();
        type_str(&mut f, "abc");
        assert_eq!(f.render_text(), "abc");
        assert_eq!(f.caret_index(), 3);
    }

    #[test]
    fn backspace_deletes_one_char_before_caret() {
        let mut f = input_field();
        type_str(&mut f, "abc");
        assert!(f.handle_key(Key::Backspace, Modifiers::default()));
        assert_eq!(f.render_text(), "ab");
        assert_eq!(f.caret_index(), 2);
    }

    #[test]
    fn backspace_at_start_is_a_no_op() {
        let mut f = input_field();
        type_str(&mut f, "ab");
        f.set_selection(0, 0);
        assert!(!f.handle_key(Key::Backspace, Modifiers::default()));
        assert_eq!(f.render_text(), "ab");
    }

    #[test]
    fn delete_removes_char_after_caret() {
        let mut f = input_field();
        type_str(&mut f, "abc");
        f.set_selection(1, 1);
        assert!(f.handle_key(Key::Delete, Modifiers::default()));
        assert_eq!(f.render_text(), "ac");
        assert_eq!(f.caret_index(), 1);
    }

    #[test]
    fn delete_with_selection_removes_the_selection() {
        let mut f = input_field();
        type_str(&mut f, "abcdef");
        f.set_selection(1, 4);
        assert!(f.handle_key(Key::Delete, Modifiers::default()));
        assert_eq!(f.render_text(), "aef");
        assert_eq!(f.caret_index(), 1);
    }

    #[test]
    fn backspace_with_reversed_selection_normalizes_first() {
        let mut f = input_field();
        type_str(&mut f, "abcdef");
        f.set_selection(4, 1);
        assert!(f.handle_key(Key::Backspace, Modifiers::default()));
        assert_eq!(f.render_text(), "aef");
    }

    #[test]
    fn arrow_without_shift_collapses_selection_to_edge() {
        let mut f = input_field();
        type_str(&mut f, "abcdef");
        f.set_selection(2, 4);
        f.handle_key(Key::ArrowRight, Modifiers::default());
        assert_eq!(f.selection_begin(), 4);
        assert_eq!(f.selection_end(), 4);

        f.set_selection(2, 4);
        f.handle_key(Key::ArrowLeft, Modifiers::default());
        assert_eq!(f.selection_begin(), 2);
        assert_eq!(f.selection_end(), 2);
    }

    #[test]
    fn shift_arrow_extends_and_shrinks_active_edge() {
        let mut f = input_field();
        type_str(&mut f, "abcdef");
        f.set_selection(2, 2);
        let shift = Modifiers {
            shift: true,
            ..Modifiers::default()
        };
        f.handle_key(Key::ArrowRight, shift);
        f.handle_key(Key::ArrowRight, shift);
        assert_eq!((f.selection_begin(), f.selection_end()), (2, 4));
        f.handle_key(Key::ArrowLeft, shift);
        assert_eq!((f.selection_begin(), f.selection_end()), (2, 3));
    }

    #[test]
    fn arrows_clamp_at_text_bounds() {
        let mut f = input_field();
        type_str(&mut f, "ab");
        f.set_selection(2, 2);
        f.handle_key(Key::ArrowRight, Modifiers::default());
        assert_eq!(f.selection_end(), 2);
        f.set_selection(0, 0);
        f.handle_key(Key::ArrowLeft, Modifiers::default());
        assert_eq!(f.selection_begin(), 0);
    }

    #[test]
    fn enter_inserts_break_only_when_multiline() {
        let mut f = input_field();
        type_str(&mut f, "ab");
        assert!(!f.handle_key(Key::Enter, Modifiers::default()));
        assert_eq!(f.render_text(), "ab");

        f.set_multiline(true);
        f.set_selection(1, 1);
        assert!(f.handle_key(Key::Enter, Modifiers::default()));
        assert_eq!(f.render_text(), "a\nb");
    }

    #[test]
    fn restrict_rejects_and_case_folds() {
        let mut f = input_field();
        f.set_restrict(Some("A-Z"));
        assert!(f.handle_key(Key::Char('q'), Modifiers::default()));
        assert_eq!(f.render_text(), "Q", "lowercase folds to allowed uppercase");
        assert!(!f.handle_key(Key::Char('7'), Modifiers::default()));
        assert_eq!(f.render_text(), "Q");
    }

    #[test]
    fn max_chars_truncates_insertion() {
        let mut f = input_field();
        f.set_max_chars(4);
        type_str(&mut f, "abcdef");
        assert_eq!(f.render_text(), "abcd");
        // Replacing a selection frees room.
        f.set_selection(0, 2);
        f.replace_selected_text("xyz");
        assert_eq!(f.render_text(), "xycd");
    }

    #[test]
    fn unknown_glyph_is_rejected() {
        let font = {
            let mut t = MetricsTable::monospace(10.0, 10.0, 12.0);
            t.strict = true;
            t.set_advance('a', 10.0);
            Rc::new(t)
        };
        let mut f = TextField::new(TextFormat::new(font, 10.0, 0));
        f.set_field_type(FieldType::Input);
        assert!(f.handle_key(Key::Char('a'), Modifiers::default()));
        assert!(!f.handle_key(Key::Char('z'), Modifiers::default()));
        assert_eq!(f.render_text(), "a");
    }

    #[test]
    fn ctrl_and_alt_tokens_never_edit() {
        let mut f = input_field();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::default()
        };
        assert!(!f.handle_key(Key::Char('v'), ctrl));
        assert_eq!(f.render_text(), "");
    }

    #[test]
    fn set_selection_clamps_out_of_range_indices() {
        let mut f = input_field();
        type_str(&mut f, "abcd");
        f.set_selection(-5, 99);
        assert_eq!((f.selection_begin(), f.selection_end()), (0, 4));
        f.reconstruct(true);
        // Geometry derives from the clamped values: one row over "abcd".
        assert_eq!(f.selection_rects().len(), 1);
        let r = f.selection_rects()[0];
        assert_eq!(r.x0, 2.0);
        assert_eq!(r.x1, 42.0);
    }

    #[test]
    fn pointer_resolution_uses_glyph_halves() {
        let mut f = input_field();
        f.set_text("abcd");
        f.reconstruct(false);
        // 'b' occupies [12, 22): left half selects 1, right half selects 2.
        assert_eq!(f.find_char_index(14.0, 5.0), 1);
        assert_eq!(f.find_char_index(20.0, 5.0), 2);
        // Left of the line snaps to its start, far right to its end.
        assert_eq!(f.find_char_index(-10.0, 5.0), 0);
        assert_eq!(f.find_char_index(500.0, 5.0), 4);
    }

    #[test]
    fn pointer_below_last_line_hits_last_line() {
        let mut f = input_field();
        f.set_text("ab\ncd");
        f.reconstruct(false);
        assert_eq!(f.find_char_index(500.0, 500.0), 4);
    }

    #[test]
    fn cursor_rect_present_for_focused_empty_input_field() {
        let mut f = input_field();
        f.set_focus(true);
        f.cursor_blinking = false;
        f.reconstruct(true);
        let rect = f.cursor_rect().expect("empty input field needs a cursor");
        // Left-aligned empty field: cursor sits near the left inset.
        assert_eq!(rect.x0, 3.5);
        assert_eq!(rect.height(), 12.0);
    }

    #[test]
    fn selection_rects_split_per_line() {
        let mut f = input_field();
        f.set_multiline(true);
        f.set_text("ab\ncd");
        f.reconstruct(true);
        f.set_selection(1, 3);
        f.reconstruct(true);
        assert_eq!(f.selection_rects().len(), 2, "one rect per touched line");
    }

    #[test]
    fn mouse_drag_selection_flow() {
        let mut f = input_field();
        f.set_text("abcdef");
        f.reconstruct(true);
        f.start_selection_at(2.0, 5.0);
        f.update_selection_to(33.0, 5.0);
        f.reconstruct(true);
        assert_eq!(f.selection_begin(), 0);
        assert_eq!(f.selection_end(), 3);
        assert!(!f.selection_rects().is_empty());
    }
}
