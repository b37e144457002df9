// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented display-tree dumps.

use std::fmt::Write as _;

use zoetrope_core::node::{DisplayStore, NodeId, NodeKind};

/// Renders the subtree rooted at `id` as indented text, one node per line:
/// kind, name, depth, and (for clips) the playhead position.
#[must_use]
pub fn print_tree(store: &DisplayStore, id: NodeId) -> String {
    let mut out = String::new();
    print_node(store, id, 0, &mut out);
    out
}

fn print_node(store: &DisplayStore, id: NodeId, level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("--");
    }
    if level > 0 {
        out.push(' ');
    }

    let kind = match store.kind(id) {
        NodeKind::Container => "container",
        NodeKind::Shape(_) => "shape",
        NodeKind::Sprite(_) => "sprite",
        NodeKind::MovieClip(_) => "clip",
        NodeKind::Text(_) => "text",
    };
    let name = store.name(id).unwrap_or("<unnamed>");
    let _ = write!(out, "{kind} {name} depth={}", store.depth_id(id));
    if let NodeKind::MovieClip(state) = store.kind(id) {
        let _ = write!(
            out,
            " frame={}/{}",
            state.current_frame(),
            state.timeline().num_frames()
        );
    }
    if let NodeKind::Text(field) = store.kind(id) {
        let _ = write!(out, " text={:?}", field.render_text());
    }
    out.push('\n');

    for child in store.children(id) {
        print_node(store, child, level + 1, out);
    }
}
