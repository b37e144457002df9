// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The run/paragraph tokenizer.
//!
//! Walks the format spans of the rendering string and splits it into
//! paragraphs → runs → words, filling the per-character code/format/width
//! arrays in parallel. Words never cross a paragraph or a run boundary; a
//! whitespace character is always a word of its own.
//!
//! The tokenizer also computes the batch change signal: old array contents
//! are compared in place before being overwritten, and only a real
//! difference (or a length change) marks `BATCHES` dirty. Re-tokenizing
//! identical text therefore never forces glyph regrouping.

use alloc::rc::Rc;
use alloc::vec::Vec;

use crate::field::{LayoutDirty, RunEntry, TextField};
use crate::format::{AutoSize, TextFormat};

/// Writes `val` at `i`, growing the vector by one when `i` is its length.
fn write_at<T>(v: &mut Vec<T>, i: usize, val: T) {
    if i < v.len() {
        v[i] = val;
    } else {
        v.push(val);
    }
}

impl TextField {
    /// Tokenizes the rendering string into paragraphs, runs, and words.
    ///
    /// Line-break handling: CR and CRLF normalize to a single logical
    /// break, as do the literal two-character escapes `\n` and `\r` (the
    /// latter is dropped entirely). A break closes the current run and
    /// paragraph.
    pub(crate) fn build_paragraphs(&mut self) {
        if self.render_chars.is_empty() {
            self.reset_paragraph_tables();
            return;
        }

        let chars: Vec<char> = self.render_chars.clone();
        let formats: Vec<Rc<TextFormat>> = self.formats.clone();
        let bounds: Vec<usize> = self.format_bounds.clone();

        let mut paragraph_count = 0;
        let mut run_count = 0;
        let mut char_index = 0;
        let mut changed = false;
        let mut line_width = 0.0;
        let mut c_start = 0;

        // Index of the run currently being accumulated.
        let mut open_run = 0;

        write_at(&mut self.paragraph_run_indices, paragraph_count, run_count);
        paragraph_count += 1;

        for (f, tf) in formats.iter().enumerate() {
            let mut word_cnt = 0;
            let mut whitespace_cnt = 0;
            let mut start_new_word = true;

            let max_line_width = self.width - (tf.indent + tf.left_margin + tf.right_margin);

            let c_end = if f == formats.len() - 1 {
                chars.len()
            } else {
                bounds[f].min(chars.len())
            };
            if c_end > c_start {
                write_at(&mut self.run_formats, run_count, tf.clone());
                write_at(
                    &mut self.runs,
                    run_count,
                    RunEntry {
                        start: self.words.len(),
                        ..RunEntry::default()
                    },
                );
                open_run = run_count;
                run_count += 1;

                let mut c = c_start;
                while c < c_end {
                    let mut code = chars[c];
                    let next = chars.get(c + 1).copied();

                    // CRLF and CR collapse to one logical break.
                    if code == '\r' {
                        code = '\n';
                        if next == Some('\n') {
                            c += 1;
                        }
                    }
                    if code == '\\' && next == Some('r') {
                        c += 2;
                        continue;
                    }
                    if code == '\\' && next == Some('n') {
                        c += 1;
                        code = '\n';
                    }

                    if code == '\n' {
                        let run = &mut self.runs[open_run];
                        run.count = word_cnt;
                        run.width = line_width;
                        run.space = whitespace_cnt;

                        write_at(&mut self.paragraph_run_indices, paragraph_count, run_count);
                        paragraph_count += 1;
                        write_at(&mut self.run_formats, run_count, tf.clone());
                        write_at(
                            &mut self.runs,
                            run_count,
                            RunEntry {
                                start: self.words.len(),
                                ..RunEntry::default()
                            },
                        );
                        open_run = run_count;
                        run_count += 1;

                        start_new_word = true;
                        whitespace_cnt = 0;
                        word_cnt = 0;
                        if self.max_width_line < line_width {
                            self.max_width_line = line_width;
                        }
                        line_width = 0.0;
                        c += 1;
                        continue;
                    }

                    let mut char_width = tf.font.char_width(tf.size, code);
                    let is_space = code == '\t' || code == ' ';

                    // Letter spacing applies to a letter not followed by
                    // whitespace or the run end.
                    if !is_space && c < c_end - 1 {
                        let n = chars.get(c + 1).copied();
                        if n != Some('\t') && n != Some(' ') {
                            char_width += tf.letter_spacing;
                        }
                    }

                    line_width += char_width;

                    changed |= self.push_char_data(char_index, code, tf, char_width);
                    char_index += 1;

                    if is_space {
                        whitespace_cnt += 1;
                        self.words.put(char_index - 1, 0.0, 0.0, char_width, 1);
                        word_cnt += 1;
                        // The next char starts a new word even if it is
                        // whitespace again.
                        start_new_word = true;
                    } else {
                        if word_cnt > 0
                            && self.auto_size == AutoSize::None
                            && self.word_wrap
                            && self.words.last_mut().width + char_width >= max_line_width
                        {
                            start_new_word = true;
                        }

                        if start_new_word {
                            self.words.put(char_index - 1, 0.0, 0.0, char_width, 1);
                            word_cnt += 1;
                        } else {
                            let last = self.words.last_mut();
                            last.width += char_width;
                            last.len += 1;
                        }
                        start_new_word = false;
                    }

                    c += 1;
                }

                let run = &mut self.runs[open_run];
                run.count = word_cnt;
                run.width = line_width;
                run.space = whitespace_cnt;

                if self.max_width_line < line_width {
                    self.max_width_line = line_width;
                }
            }

            c_start = c_end;
        }

        if changed || self.char_codes.len() != char_index {
            self.dirty |= LayoutDirty::BATCHES;
        }

        self.paragraph_run_indices.truncate(paragraph_count);
        self.runs.truncate(run_count);
        self.run_formats.truncate(run_count);
        self.char_codes.truncate(char_index);
        self.char_formats.truncate(char_index);
        self.char_widths.truncate(char_index);
    }

    /// Overwrites the per-character arrays at `i`, reporting whether the
    /// previous contents differed.
    fn push_char_data(&mut self, i: usize, code: char, tf: &Rc<TextFormat>, width: f64) -> bool {
        let mut changed = i >= self.char_codes.len();
        if !changed {
            changed |= self.char_codes[i] != code;
            changed |= !Rc::ptr_eq(&self.char_formats[i], tf);
            changed |= self.char_widths[i] != width;
        }
        write_at(&mut self.char_codes, i, code);
        write_at(&mut self.char_formats, i, tf.clone());
        write_at(&mut self.char_widths, i, width);
        changed
    }

    /// Clears paragraph state for an empty rendering string.
    fn reset_paragraph_tables(&mut self) {
        if !self.char_codes.is_empty() {
            self.dirty |= LayoutDirty::BATCHES;
        }
        self.char_codes.clear();
        self.char_formats.clear();
        self.char_widths.clear();
        self.paragraph_run_indices.clear();
        self.run_formats.clear();
        self.runs.clear();
    }
}
