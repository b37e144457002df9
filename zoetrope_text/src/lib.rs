// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental text layout and editing engine.
//!
//! `zoetrope_text` implements the paragraph/word/line builder behind
//! Flash-style text fields: styled text is tokenized into format-homogeneous
//! runs, words, and lines under word-wrap and multi-format constraints, and
//! per-character glyph positions are rebuilt incrementally, stage by stage,
//! instead of relayouting from scratch on every mutation. It is `no_std`
//! compatible (with `alloc`).
//!
//! # Pipeline
//!
//! A [`TextField`] owns a staged dirty pipeline with strict precedence:
//!
//! ```text
//!   TEXT ⇒ POSITIONS ⇒ GLYPHS ⇒ SHAPES
//!     │        │          │        │
//!     ▼        ▼          ▼        ▼
//!   tokenize  line-break  glyph    cursor/selection
//!   into runs and place   batches  geometry
//!   and words characters
//! ```
//!
//! Marking an earlier stage dirty implies every later stage must re-run
//! before the field is displayable; a later stage can be marked alone to
//! redo only its own work. A separate change signal (computed by the
//! tokenizer from the per-character diff, not from the raw text-dirty flag)
//! decides whether glyph batches are regrouped or merely repositioned.
//!
//! **[`format`]** — [`TextFormat`](format::TextFormat) and the optional-field
//! [`TextFormatUpdate`](format::TextFormatUpdate) merge used by ranged
//! format application.
//!
//! **[`font`]** — the [`FontTable`](font::FontTable) metrics trait. Glyph
//! metrics are consulted as pure functions; rendering is external.
//!
//! **[`word`]** — the pooled, rewindable [`WordStore`](word::WordStore).
//!
//! **[`paragraph`]** — the run/paragraph tokenizer.
//!
//! **[`layout`]** — the line breaker and character positioner.
//!
//! **[`glyphs`]** — per-format glyph batches with rebuild diffing.
//!
//! **[`input`]** — the selection/cursor/keyboard controller.
//!
//! **[`restrict`]** — the `restrict` character-set filter for input fields.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod field;
pub mod font;
pub mod format;
pub mod glyphs;
pub mod input;
pub mod layout;
pub mod paragraph;
pub mod restrict;
pub mod word;

pub use field::{LayoutDirty, TextField};
pub use font::FontTable;
pub use format::{Align, AutoSize, FieldType, TextFormat, TextFormatUpdate};
