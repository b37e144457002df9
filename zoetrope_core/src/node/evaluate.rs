// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame evaluation and change tracking.
//!
//! Evaluation follows a drain-recompute pattern per dirty channel:
//!
//! 1. **TRANSFORM** — Drain dirty indices, recompute each node's
//!    `world_transform` as `parent_world * local_transform` and
//!    `effective_visible` as `parent_effective_visible && visible`.
//! 2. **CONTENT** — Drain dirty indices (no recomputation; the renderer
//!    reads the current node payloads directly).
//! 3. **TOPOLOGY** — Drain and discard (the traversal order was already
//!    rebuilt at the start of evaluation if needed).
//!
//! [`FrameChanges`] uses raw slot indices (`u32`) rather than
//! [`NodeId`](super::NodeId) handles so the renderer can index directly
//! into the store's arrays via the `*_at()` accessors without paying for
//! generation checks on every access.

use alloc::vec::Vec;

use kurbo::Affine;

use crate::dirty;

use super::id::INVALID;
use super::store::DisplayStore;

/// The set of changes produced by a single [`DisplayStore::evaluate`] call.
#[derive(Clone, Debug, Default)]
pub struct FrameChanges {
    /// Nodes whose world transform was recomputed.
    pub transforms: Vec<u32>,
    /// Nodes whose content changed.
    pub content: Vec<u32>,
    /// Nodes that transitioned from visible to effectively hidden.
    pub hidden: Vec<u32>,
    /// Nodes that transitioned from effectively hidden to visible.
    pub shown: Vec<u32>,
    /// Nodes created since the last evaluate.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last evaluate.
    pub removed: Vec<u32>,
    /// Whether the tree topology changed (traversal order was rebuilt).
    pub topology_changed: bool,
}

impl FrameChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.transforms.clear();
        self.content.clear();
        self.hidden.clear();
        self.shown.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }
}

impl DisplayStore {
    /// Evaluates the node tree, recomputing dirty properties and returning
    /// the set of changes.
    pub fn evaluate(&mut self) -> FrameChanges {
        let mut changes = FrameChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses a caller-provided
    /// buffer to avoid allocation.
    pub fn evaluate_into(&mut self, changes: &mut FrameChanges) {
        changes.clear();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            changes.topology_changed = true;
            self.traversal_dirty = false;
        }

        // Drain TRANSFORM — collect dirty indices, then recompute world
        // transforms and effective visibility in parent-before-child order.
        let dirty_transforms: Vec<u32> = self
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &dirty_transforms {
            let parent_idx = self.parent[idx as usize];
            let (parent_world, parent_visible) = if parent_idx != INVALID {
                (
                    self.world_transform[parent_idx as usize],
                    self.effective_visible[parent_idx as usize],
                )
            } else {
                (Affine::IDENTITY, true)
            };
            self.world_transform[idx as usize] =
                parent_world * self.local_transform[idx as usize];

            let new_visible = parent_visible && self.visible[idx as usize];
            let old_visible = self.effective_visible[idx as usize];
            if new_visible != old_visible {
                if new_visible {
                    changes.shown.push(idx);
                } else {
                    changes.hidden.push(idx);
                }
                self.effective_visible[idx as usize] = new_visible;
            }
        }
        changes.transforms = dirty_transforms;

        // Drain CONTENT — no recomputation, just collect.
        changes.content = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();

        // Drain TOPOLOGY (just consume, changes are structural).
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        // Move lifecycle lists.
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    /// Returns the current traversal order (depth-first pre-order, siblings
    /// in depth order).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called at
    /// least once.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                self.dfs_collect(idx);
            }
        }
    }

    fn dfs_collect(&mut self, idx: u32) {
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }
}
