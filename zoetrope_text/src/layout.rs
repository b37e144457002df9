// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The line breaker and character positioner.
//!
//! Consumes the tokenizer's runs and words and produces per-line geometry
//! and absolute per-character positions. Runs whose paragraph fits the
//! field (or fields without word wrap) go onto one line unconditionally;
//! otherwise words are packed greedily, keeping a single space advance in
//! reserve before breaking. Mixed formats on one line are baseline-aligned
//! by offsetting shorter formats down by the height difference.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::field::TextField;
use crate::format::{Align, AutoSize, TextFormat};

impl TextField {
    /// Places all words and characters. `text_was_dirty` reports whether
    /// this pass follows a retokenize (auto-size width tracking only
    /// reacts to actual text changes).
    pub(crate) fn position_words(&mut self, text_was_dirty: bool) {
        // Auto-size without wrapping tracks the widest tokenized line.
        if self.auto_size != AutoSize::None && !self.word_wrap && text_was_dirty {
            let complete = self.max_width_line
                + self.format.indent
                + self.format.left_margin
                + self.format.right_margin;
            self.adjust_position_for_auto_size(complete);
        }

        let max_line_width =
            self.width - (self.format.indent + self.format.left_margin + self.format.right_margin);

        self.lines.clear();
        self.char_positions_x.clear();
        self.char_positions_y.clear();
        self.max_scroll_h = 0;
        self.max_scroll_v = 0;
        self.biggest_line = 0;

        let mut line_formats: Vec<Rc<TextFormat>> = Vec::new();
        let p_len = self.paragraph_run_indices.len();
        let mut linecnt = 0;

        // -- Phase 1: distribute words onto lines --

        for p in 0..p_len {
            let tr_start = self.paragraph_run_indices[p];
            let tr_end = if p == p_len - 1 {
                self.runs.len()
            } else {
                self.paragraph_run_indices[p + 1]
            };

            // Line height of this paragraph: tallest run, leading included.
            let mut para_height = 0.0;
            let mut para_width = 0.0;
            let mut w_len = 0;
            for tr in tr_start..tr_end {
                let h = self.run_formats[tr].line_height();
                if para_height < h {
                    para_height = h;
                }
                w_len = self.runs[tr].start + self.runs[tr].count;
                para_width += self.runs[tr].width;
            }

            self.lines.word_start.push(self.runs[tr_start].start);
            self.lines.word_end.push(w_len);
            self.lines.width.push(0.0);
            self.lines.spaces.push(0);
            self.lines.height.push(para_height);
            line_formats.push(self.run_formats[tr_end - 1].clone());

            for tr in tr_start..tr_end {
                let format = self.run_formats[tr].clone();
                let run = self.runs[tr];
                let run_end = run.start + run.count;

                if para_width <= max_line_width || !self.word_wrap {
                    // The whole paragraph fits (or wrapping is off):
                    // everything lands on the current line.
                    for w in run.start..run_end {
                        let word = self.words.get(w);
                        self.lines.word_end[linecnt] = w + 1;
                        self.lines.width[linecnt] += word.width;
                        line_formats[linecnt] = format.clone();
                        if is_space_word(self, w) {
                            self.lines.spaces[linecnt] += 1;
                        }
                    }
                } else {
                    // Greedy packing with one space advance in reserve.
                    let space_width = format.font.char_width(format.size, ' ');
                    let mut indent = 0.0;
                    for w in run.start..run_end {
                        let word = self.words.get(w);
                        let is_space = is_space_word(self, w);
                        if is_space {
                            self.lines.spaces[linecnt] += 1;
                        }
                        if is_space
                            || self.lines.width[linecnt] + word.width
                                <= max_line_width - indent - space_width
                            || self.lines.width[linecnt] == 0.0
                        {
                            self.lines.word_end[linecnt] = w + 1;
                            self.lines.width[linecnt] += word.width;
                            line_formats[linecnt] = format.clone();
                        } else {
                            linecnt += 1;
                            self.lines.word_start.push(w);
                            self.lines.word_end.push(w + 1);
                            self.lines.width.push(word.width);
                            self.lines.spaces.push(0);
                            self.lines.height.push(para_height);
                            line_formats.push(format.clone());
                            indent = format.indent;
                        }
                    }
                }
            }
            linecnt += 1;
        }

        // -- Phase 2: align lines and place characters --

        let l_cnt = self.lines.len();
        let mut offsety = self.text_offset_y + 2.0;
        let mut char_cnt = 0;
        let mut text_width = 0.0;

        for l in 0..l_cnt {
            let line_length = self.lines.width[l];
            let line_height = self.lines.height[l];
            let word_start = self.lines.word_start[l];
            let word_end = self.lines.word_end[l];
            let format = line_formats[l].clone();

            let line_space_left = max_line_width - line_length;
            let mut offsetx = self.text_offset_x + format.left_margin + format.indent;

            match format.align {
                Align::Justify => {
                    // Space redistribution is intentionally not performed;
                    // only the first line keeps its indent.
                    if l != 0 {
                        offsetx -= format.indent;
                    }
                }
                Align::Center => {
                    if line_space_left > 0.0 {
                        offsetx += line_space_left / 2.0;
                    } else {
                        offsetx += 2.0;
                    }
                }
                Align::Right => {
                    if line_space_left > 0.0 {
                        offsetx += line_space_left - 2.0;
                    } else {
                        offsetx += 2.0;
                    }
                }
                Align::Left => {
                    offsetx += 2.0;
                }
            }

            self.lines.start_x.push(offsetx);
            self.lines.start_y.push(offsety);
            self.lines.char_start.push(char_cnt);

            let mut line_width = 0.0;
            for w in word_start..word_end {
                let word = self.words.get(w);
                let c_start = word.start;
                let c_end = word.start + word.len;

                // Baseline-align shorter formats on a taller line.
                let tf = self.char_formats[c_start].clone();
                let mut diff = line_height - tf.line_height();
                diff = if diff > 0.0 { diff - 2.0 } else { 0.0 };

                {
                    let word = self.words.get_mut(w);
                    word.x = offsetx;
                    word.y = offsety + diff;
                }

                let mut char_pos = 0.0;
                for c in c_start..c_end {
                    self.char_positions_x.push(offsetx + char_pos);
                    self.char_positions_y.push(offsety + diff);
                    char_pos += self.char_widths[c];
                    char_cnt += 1;
                }

                offsetx += char_pos;
                line_width += char_pos;
            }

            self.lines.char_end.push(char_cnt);
            offsety += line_height;

            if line_width > text_width {
                self.biggest_line = l;
                text_width = line_width;
            }
        }

        self.text_width = text_width;
        self.text_height = offsety;

        if self.auto_size != AutoSize::None {
            self.height = self.text_height + 4.0;
        }

        // Horizontal max-scroll: last character of the widest line beyond
        // which content still exceeds the visible box, scanning from the end.
        if self.text_width > self.width {
            let start = self.lines.char_start[self.biggest_line];
            let mut c = self.lines.char_end[self.biggest_line];
            let mut acc = 0.0;
            while c > start {
                c -= 1;
                acc += self.char_widths[c];
                if acc > self.width {
                    self.max_scroll_h = c;
                    break;
                }
            }
        }

        // Vertical max-scroll, in lines, scanning from the end.
        if self.text_height > self.height {
            let mut l = self.lines.len();
            let mut acc = 4.0;
            while l > 0 {
                l -= 1;
                acc += self.lines.height[l];
                if acc > self.height {
                    self.max_scroll_v = l + 1;
                    break;
                }
            }
        }
    }
}

/// Whether word `w` is a whitespace word.
fn is_space_word(field: &TextField, w: usize) -> bool {
    let start = field.words.get(w).start;
    matches!(field.char_codes[start], ' ' | '\t')
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;

    use crate::field::TextField;
    use crate::font::MetricsTable;
    use crate::format::{Align, AutoSize, TextFormat, TextFormatUpdate};

    /// 10 units per character at size 10, 'W' widened to 15, lines 12 tall.
    fn field() -> TextField {
        let mut table = MetricsTable::monospace(10.0, 10.0, 12.0);
        table.set_advance('W', 15.0);
        TextField::new(TextFormat::new(Rc::new(table), 10.0, 0))
    }

    #[test]
    fn hello_world_wraps_into_two_lines_at_width_100() {
        let mut f = field();
        f.set_word_wrap(true);
        f.set_width(100.0);
        f.set_text("Hello World");
        f.reconstruct(false);

        assert_eq!(f.num_lines(), 2);
        assert_eq!(f.line_text(0), "Hello ");
        assert_eq!(f.line_text(1), "World");
        assert_eq!(f.line_length(0), 60.0);
        assert_eq!(f.line_length(1), 55.0);
        for l in 0..f.num_lines() {
            assert!(f.line_length(l) <= 100.0, "line {l} exceeds the field");
        }
    }

    #[test]
    fn no_wrap_keeps_one_line_and_overflows() {
        let mut f = field();
        f.set_width(40.0);
        f.set_text("Hello World");
        f.reconstruct(false);
        assert_eq!(f.num_lines(), 1);
        assert_eq!(f.text_width(), 115.0);
    }

    #[test]
    fn paragraph_break_forces_new_line_even_without_wrap() {
        let mut f = field();
        f.set_text("ab\ncd");
        f.reconstruct(false);
        assert_eq!(f.num_lines(), 2);
        assert_eq!(f.line_text(0), "ab");
        assert_eq!(f.line_text(1), "cd");
        // Second line starts one line height below the first.
        assert_eq!(f.lines.start_y[1] - f.lines.start_y[0], 12.0);
    }

    #[test]
    fn left_alignment_inset_and_char_positions() {
        let mut f = field();
        f.set_text("abc");
        f.reconstruct(false);
        assert_eq!(f.lines.start_x[0], 2.0);
        assert_eq!(f.char_positions_x, alloc::vec![2.0, 12.0, 22.0]);
        assert_eq!(f.char_positions_y, alloc::vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn center_alignment_halves_leftover_space() {
        let mut f = field();
        f.set_width(100.0);
        let mut fmt = f.text_format().clone();
        fmt.align = Align::Center;
        f.set_text_format(fmt);
        f.set_text("abc");
        f.reconstruct(false);
        // Leftover = 100 - 30; line starts at 35.
        assert_eq!(f.lines.start_x[0], 35.0);
    }

    #[test]
    fn right_alignment_uses_leftover_minus_inset() {
        let mut f = field();
        f.set_width(100.0);
        let mut fmt = f.text_format().clone();
        fmt.align = Align::Right;
        f.set_text_format(fmt);
        f.set_text("abc");
        f.reconstruct(false);
        assert_eq!(f.lines.start_x[0], 68.0);
    }

    #[test]
    fn justify_behaves_like_left_without_redistribution() {
        let mut f = field();
        f.set_width(200.0);
        f.set_word_wrap(true);
        let mut fmt = f.text_format().clone();
        fmt.align = Align::Justify;
        fmt.indent = 6.0;
        f.set_text_format(fmt);
        f.set_text("aaaa bbbb cccc dddd eeee ffff gggg hhhh");
        f.reconstruct(false);
        assert!(f.num_lines() > 1);
        // First line keeps the indent, later lines drop it.
        assert_eq!(f.lines.start_x[0], 6.0);
        assert_eq!(f.lines.start_x[1], 0.0);
        // No extra space was distributed between words.
        let second_line_first_word = f.words.get(f.lines.word_start[1]);
        assert_eq!(second_line_first_word.x, 0.0);
    }

    #[test]
    fn mixed_format_line_uses_tallest_height_and_baseline_offset() {
        let mut f = field();
        f.set_text("aabb");
        let update = TextFormatUpdate {
            size: Some(20.0),
            ..TextFormatUpdate::default()
        };
        f.set_text_format_range(&update, Some(2), Some(4));
        f.reconstruct(false);

        assert_eq!(f.num_lines(), 1);
        // Line height is the larger format's: 12 * 20/10 = 24.
        assert_eq!(f.lines.height[0], 24.0);
        // The small-format word drops by (24 - 12) - 2 = 10.
        assert_eq!(f.char_positions_y[0], 12.0);
        // The large-format word sits on the line origin.
        assert_eq!(f.char_positions_y[2], 2.0);
    }

    #[test]
    fn autosize_left_tracks_widest_line() {
        let mut f = field();
        f.set_auto_size(AutoSize::Left);
        f.set_text("abcd");
        f.reconstruct(false);
        assert_eq!(f.width(), 44.0);
        assert_eq!(f.height(), f.text_height() + 4.0);
        assert_eq!(f.take_position_shift(), 0.0);
    }

    #[test]
    fn autosize_right_shifts_anchor_left_on_growth() {
        let mut f = field();
        f.set_auto_size(AutoSize::Right);
        f.set_text("abcd");
        f.reconstruct(false);
        // Width went from 100 to 44; the field edge moves right by 56,
        // so the anchor shift is the opposite of the delta.
        assert_eq!(f.width(), 44.0);
        assert_eq!(f.take_position_shift(), 56.0);
        // Taking the shift drains it.
        assert_eq!(f.take_position_shift(), 0.0);
    }

    #[test]
    fn autosize_center_shifts_anchor_by_half() {
        let mut f = field();
        f.set_auto_size(AutoSize::Center);
        f.set_text("abcd");
        f.reconstruct(false);
        assert_eq!(f.take_position_shift(), 28.0);
    }

    #[test]
    fn relayout_without_mutation_is_idempotent() {
        let mut f = field();
        f.set_word_wrap(true);
        f.set_width(100.0);
        f.set_text("Hello World again and again");
        f.reconstruct(false);
        let x1 = f.char_positions_x.clone();
        let y1 = f.char_positions_y.clone();

        f.mark_dirty(crate::field::LayoutDirty::TEXT);
        f.reconstruct(false);
        assert_eq!(f.char_positions_x, x1);
        assert_eq!(f.char_positions_y, y1);
    }

    #[test]
    fn vertical_max_scroll_counts_from_the_end() {
        let mut f = field();
        f.set_height(30.0);
        f.set_text("a\nb\nc\nd\ne");
        f.reconstruct(false);
        // 5 lines of 12 = 60 > 30: some lines scroll.
        assert!(f.max_scroll_v() > 0);
        assert!(f.max_scroll_v() < f.num_lines());
        f.set_scroll_v(100);
        assert_eq!(f.scroll_v(), f.max_scroll_v());
    }

    #[test]
    fn horizontal_max_scroll_set_when_text_overflows() {
        let mut f = field();
        f.set_width(50.0);
        f.set_text("abcdefghij");
        f.reconstruct(false);
        assert!(f.text_width() > f.width());
        assert!(f.max_scroll_h() > 0);
    }

    #[test]
    fn wrap_never_exceeds_field_width() {
        let mut f = field();
        f.set_word_wrap(true);
        f.set_width(72.0);
        f.set_text("one two three four five six seven");
        f.reconstruct(false);
        for l in 0..f.num_lines() {
            // Trailing space words may pad past the box; the non-space
            // content must fit.
            let text = f.line_text(l);
            let content_width = 10.0 * text.trim_end().chars().count() as f64;
            assert!(content_width <= 72.0, "line {l} content too wide");
        }
    }

    #[test]
    fn empty_lines_between_breaks_keep_their_height() {
        let mut f = field();
        f.set_text("a\n\nb");
        f.reconstruct(false);
        assert_eq!(f.num_lines(), 3);
        assert_eq!(f.line_text(1), "");
        assert_eq!(f.lines.start_y[2] - f.lines.start_y[1], 12.0);
    }
}
