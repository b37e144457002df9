// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame plan: an ordered sequence of draw items for one frame.

use alloc::vec::Vec;

use kurbo::Affine;
use zoetrope_core::node::{DisplayStore, GeometryId, NodeKind};

/// What a draw item presents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawSource {
    /// Externally built vector geometry.
    Geometry(GeometryId),
    /// A text field's glyph batches; the renderer pulls them from the
    /// store via the item's node slot.
    Text,
}

/// A single draw command in the frame plan.
///
/// Items are produced in back-to-front order, matching the display tree's
/// traversal order (siblings by timeline depth).
#[derive(Clone, Copy, Debug)]
pub struct DrawItem {
    /// Raw store slot of the originating node.
    pub node: u32,
    /// Resolved world transform.
    pub transform: Affine,
    /// What to draw.
    pub source: DrawSource,
}

/// An ordered list of draw commands for a single frame.
#[derive(Clone, Debug, Default)]
pub struct FramePlan {
    /// Draw items in back-to-front order.
    pub items: Vec<DrawItem>,
}

impl FramePlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Rebuilds the plan from an evaluated store.
    ///
    /// Effectively hidden nodes contribute nothing; grouping nodes
    /// contribute only through their drawable descendants. Call
    /// [`DisplayStore::evaluate`] first so world transforms and effective
    /// visibility are current.
    pub fn build(&mut self, store: &DisplayStore) {
        self.clear();
        for &idx in store.traversal_order() {
            if !store.effective_visible_at(idx) {
                continue;
            }
            let source = match store.kind_at(idx) {
                NodeKind::Shape(geometry) => Some(DrawSource::Geometry(*geometry)),
                NodeKind::Sprite(Some(geometry)) => Some(DrawSource::Geometry(*geometry)),
                NodeKind::Text(_) => Some(DrawSource::Text),
                NodeKind::Container | NodeKind::Sprite(None) | NodeKind::MovieClip(_) => None,
            };
            if let Some(source) = source {
                self.items.push(DrawItem {
                    node: idx,
                    transform: store.world_transform_at(idx),
                    source,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;

    use super::*;
    use zoetrope_core::node::NodeKind;
    use zoetrope_text::font::MetricsTable;
    use zoetrope_text::{TextField, TextFormat};

    fn text_node(store: &mut DisplayStore) -> zoetrope_core::NodeId {
        let font = Rc::new(MetricsTable::monospace(10.0, 10.0, 12.0));
        let field = TextField::new(TextFormat::new(font, 10.0, 0));
        store.create_node(NodeKind::Text(Box::new(field)))
    }

    #[test]
    fn plan_orders_items_back_to_front_by_depth() {
        let mut store = DisplayStore::new();
        let root = store.create_node(NodeKind::Container);
        let back = store.create_node(NodeKind::Shape(GeometryId(1)));
        let front = store.create_node(NodeKind::Shape(GeometryId(2)));
        store.add_child_at_depth(root, front, 20);
        store.add_child_at_depth(root, back, 10);
        let _ = store.evaluate();

        let mut plan = FramePlan::new();
        plan.build(&store);

        assert_eq!(plan.items.len(), 2);
        assert_eq!(plan.items[0].source, DrawSource::Geometry(GeometryId(1)));
        assert_eq!(plan.items[1].source, DrawSource::Geometry(GeometryId(2)));
    }

    #[test]
    fn hidden_subtrees_are_culled() {
        let mut store = DisplayStore::new();
        let root = store.create_node(NodeKind::Container);
        let group = store.create_node(NodeKind::Container);
        let shape = store.create_node(NodeKind::Shape(GeometryId(1)));
        store.add_child_at_depth(root, group, 1);
        store.add_child_at_depth(group, shape, 1);
        store.set_visible(group, false);
        let _ = store.evaluate();

        let mut plan = FramePlan::new();
        plan.build(&store);
        assert!(plan.items.is_empty());
    }

    #[test]
    fn grouping_nodes_contribute_no_items() {
        let mut store = DisplayStore::new();
        let root = store.create_node(NodeKind::Container);
        let sprite = store.create_node(NodeKind::Sprite(None));
        store.add_child_at_depth(root, sprite, 1);
        let _ = store.evaluate();

        let mut plan = FramePlan::new();
        plan.build(&store);
        assert!(plan.items.is_empty());
    }

    #[test]
    fn items_carry_world_transforms() {
        let mut store = DisplayStore::new();
        let root = store.create_node(NodeKind::Container);
        let shape = store.create_node(NodeKind::Shape(GeometryId(1)));
        store.add_child_at_depth(root, shape, 1);
        store.set_transform(root, Affine::translate((10.0, 0.0)));
        store.set_transform(shape, Affine::translate((0.0, 5.0)));
        let _ = store.evaluate();

        let mut plan = FramePlan::new();
        plan.build(&store);
        assert_eq!(
            plan.items[0].transform,
            Affine::translate((10.0, 0.0)) * Affine::translate((0.0, 5.0))
        );
    }

    #[test]
    fn text_nodes_emit_text_items() {
        let mut store = DisplayStore::new();
        let root = store.create_node(NodeKind::Container);
        let text = text_node(&mut store);
        store.add_child_at_depth(root, text, 1);
        let _ = store.evaluate();

        let mut plan = FramePlan::new();
        plan.build(&store);
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].source, DrawSource::Text);
        assert_eq!(plan.items[0].node, text.index());
    }
}
