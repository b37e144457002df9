// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording and pretty-printing for zoetrope diagnostics.
//!
//! [`RecorderSink`] implements
//! [`PlayerSink`](zoetrope_core::trace::PlayerSink) and collects playback
//! events for inspection or JSON export. [`pretty`] renders display trees
//! as indented text, the way you would eyeball a misbehaving timeline.

pub mod pretty;
pub mod recorder;

pub use pretty::print_tree;
pub use recorder::{RecordedEvent, RecorderSink};
