// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays display-node storage with allocation, topology, and
//! property management.
//!
//! The store doubles as the engine's object pool: destroyed nodes are
//! recycled through a free list and fully re-initialized on reuse, and
//! generation counters make stale handles panic instead of aliasing the
//! new occupant. Sibling lists are kept ordered by timeline depth.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Affine;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};
use zoetrope_text::TextField;

use crate::clip::MovieClipState;
use crate::dirty;

use super::id::{GeometryId, INVALID, NodeId, SESSION_NONE};
use super::traverse::Children;

/// The closed set of display-node variants.
///
/// Dispatch is by `match`; there are no runtime type tests. Heavy payloads
/// (clip state, text fields) are boxed so plain nodes stay small.
#[derive(Debug)]
pub enum NodeKind {
    /// A grouping node with no content of its own.
    Container,
    /// A leaf presenting externally built vector geometry.
    Shape(GeometryId),
    /// A container that also carries its own geometry.
    Sprite(Option<GeometryId>),
    /// A timeline-driven animated container.
    MovieClip(Box<MovieClipState>),
    /// A text display/input field.
    Text(Box<TextField>),
}

/// Struct-of-arrays storage for all display nodes.
#[derive(Debug)]
pub struct DisplayStore {
    // -- Topology (sibling lists ordered by depth_id) --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties --
    pub(crate) name: Vec<Option<String>>,
    pub(crate) local_transform: Vec<Affine>,
    pub(crate) visible: Vec<bool>,
    pub(crate) depth_id: Vec<i32>,
    pub(crate) session_id: Vec<i32>,
    pub(crate) timeline_owned: Vec<bool>,
    pub(crate) kind: Vec<NodeKind>,

    // -- Computed properties (written by evaluate) --
    pub(crate) world_transform: Vec<Affine>,
    pub(crate) effective_visible: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for DisplayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            name: Vec::new(),
            local_transform: Vec::new(),
            visible: Vec::new(),
            depth_id: Vec::new(),
            session_id: Vec::new(),
            timeline_owned: Vec::new(),
            kind: Vec::new(),
            world_transform: Vec::new(),
            effective_visible: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new node of the given kind and returns its handle.
    ///
    /// The node starts with an identity transform, visible, no name, no
    /// session, and no parent. Slots of previously destroyed nodes are
    /// reused (single-owner handoff: the slot is fully re-initialized).
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.name[i] = None;
            self.local_transform[i] = Affine::IDENTITY;
            self.visible[i] = true;
            self.depth_id[i] = 0;
            self.session_id[i] = SESSION_NONE;
            self.timeline_owned[i] = false;
            self.kind[i] = kind;
            self.world_transform[i] = Affine::IDENTITY;
            self.effective_visible[i] = true;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.name.push(None);
            self.local_transform.push(Affine::IDENTITY);
            self.visible.push(true);
            self.depth_id.push(0);
            self.session_id.push(SESSION_NONE);
            self.timeline_owned.push(false);
            self.kind.push(kind);
            self.world_transform.push(Affine::IDENTITY);
            self.effective_visible.push(true);
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first) or if the
    /// handle is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        // Drop heavy payloads now rather than on slot reuse.
        self.kind[idx as usize] = NodeKind::Container;

        self.free_list.push(idx);
        self.traversal_dirty = true;
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`, keeping whatever depth
    /// it already carries.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a
    /// parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        self.link_dirty_edges(c, p);
    }

    /// Inserts `child` into `parent`'s sibling list ordered by depth.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent,
    /// or if another child of `parent` already occupies `depth`.
    pub fn add_child_at_depth(&mut self, parent: NodeId, child: NodeId, depth: i32) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            self.child_at_depth(parent, depth).is_none(),
            "depth {depth} already occupied"
        );

        self.depth_id[c as usize] = depth;
        self.parent[c as usize] = p;

        // Find the first sibling with a greater depth.
        let mut cur = self.first_child[p as usize];
        let mut prev = INVALID;
        while cur != INVALID && self.depth_id[cur as usize] <= depth {
            prev = cur;
            cur = self.next_sibling[cur as usize];
        }

        self.prev_sibling[c as usize] = prev;
        self.next_sibling[c as usize] = cur;
        if prev == INVALID {
            self.first_child[p as usize] = c;
        } else {
            self.next_sibling[prev as usize] = c;
        }
        if cur != INVALID {
            self.prev_sibling[cur as usize] = c;
        }

        self.link_dirty_edges(c, p);
    }

    fn link_dirty_edges(&mut self, c: u32, p: u32) {
        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        self.dirty.mark_with(c, dirty::TRANSFORM, &EagerPolicy);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);

        self.dirty.remove_dependency(c, p, dirty::TRANSFORM);
        self.dirty.mark_with(c, dirty::TRANSFORM, &EagerPolicy);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(NodeId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a node, in depth
    /// order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Number of direct children.
    #[must_use]
    pub fn num_children(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Returns the child of `parent` occupying `depth`, if any.
    #[must_use]
    pub fn child_at_depth(&self, parent: NodeId, depth: i32) -> Option<NodeId> {
        self.children(parent)
            .find(|&c| self.depth_id[c.idx as usize] == depth)
    }

    // -- Property access --

    /// Returns the node's instance name.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.name[id.idx as usize].as_deref()
    }

    /// Sets the node's instance name.
    pub fn set_name(&mut self, id: NodeId, name: Option<String>) {
        self.validate(id);
        self.name[id.idx as usize] = name;
    }

    /// Returns the local transform.
    #[must_use]
    pub fn local_transform(&self, id: NodeId) -> Affine {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Sets the local transform. Marks the TRANSFORM channel dirty with
    /// eager propagation to descendants.
    pub fn set_transform(&mut self, id: NodeId, transform: Affine) {
        self.validate(id);
        self.local_transform[id.idx as usize] = transform;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Returns the local visibility flag.
    #[must_use]
    pub fn visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Sets the local visibility flag. Routed through the TRANSFORM
    /// channel so one drain recomputes effective visibility.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.validate(id);
        self.visible[id.idx as usize] = visible;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Returns the timeline depth of a node.
    #[must_use]
    pub fn depth_id(&self, id: NodeId) -> i32 {
        self.validate(id);
        self.depth_id[id.idx as usize]
    }

    /// Returns the session id of a node.
    #[must_use]
    pub fn session_id(&self, id: NodeId) -> i32 {
        self.validate(id);
        self.session_id[id.idx as usize]
    }

    /// Sets the session id of a node.
    pub fn set_session_id(&mut self, id: NodeId, session: i32) {
        self.validate(id);
        self.session_id[id.idx as usize] = session;
    }

    /// Whether the node was placed by a timeline (as opposed to scripts).
    #[must_use]
    pub fn timeline_owned(&self, id: NodeId) -> bool {
        self.validate(id);
        self.timeline_owned[id.idx as usize]
    }

    /// Marks the node as timeline-placed or script-placed.
    pub fn set_timeline_owned(&mut self, id: NodeId, owned: bool) {
        self.validate(id);
        self.timeline_owned[id.idx as usize] = owned;
    }

    /// Resets transform and visibility to their initial values, as
    /// timeline construction requires for a freshly (re)placed child.
    pub fn reset_node(&mut self, id: NodeId) {
        self.set_transform(id, Affine::IDENTITY);
        self.set_visible(id, true);
    }

    /// Marks a node's content (graphics, glyphs, frame contents) changed.
    pub fn mark_content(&mut self, id: NodeId) {
        self.validate(id);
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    // -- Kind access --

    /// Returns the node's kind.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.validate(id);
        &self.kind[id.idx as usize]
    }

    /// Returns the node's kind mutably. Content invalidation is the
    /// caller's responsibility ([`mark_content`](Self::mark_content)).
    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        self.validate(id);
        &mut self.kind[id.idx as usize]
    }

    /// Whether the node is a movie clip.
    #[must_use]
    pub fn is_movie_clip(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::MovieClip(_))
    }

    /// Returns the movie-clip state of a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is not a movie clip.
    #[must_use]
    pub fn clip(&self, id: NodeId) -> &MovieClipState {
        match self.kind(id) {
            NodeKind::MovieClip(state) => state,
            other => panic!("node {id:?} is not a movie clip (kind: {other:?})"),
        }
    }

    /// Returns the movie-clip state of a node, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is not a movie clip.
    pub fn clip_mut(&mut self, id: NodeId) -> &mut MovieClipState {
        self.validate(id);
        match &mut self.kind[id.idx as usize] {
            NodeKind::MovieClip(state) => state,
            other => panic!("node {id:?} is not a movie clip (kind: {other:?})"),
        }
    }

    /// Returns the text field of a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is not a text field.
    #[must_use]
    pub fn text(&self, id: NodeId) -> &TextField {
        match self.kind(id) {
            NodeKind::Text(field) => field,
            other => panic!("node {id:?} is not a text field (kind: {other:?})"),
        }
    }

    /// Returns the text field of a node, mutably.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node is not a text field.
    pub fn text_mut(&mut self, id: NodeId) -> &mut TextField {
        self.validate(id);
        match &mut self.kind[id.idx as usize] {
            NodeKind::Text(field) => field,
            other => panic!("node {id:?} is not a text field (kind: {other:?})"),
        }
    }

    // -- Computed properties --

    /// Returns the computed world transform.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Affine {
        self.validate(id);
        self.world_transform[id.idx as usize]
    }

    /// Returns whether the node is effectively visible (no ancestor hides
    /// it).
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.effective_visible[id.idx as usize]
    }

    /// Returns the computed world transform at raw slot `idx`, skipping
    /// generation checks. Only use with indices from
    /// [`traversal_order`](Self::traversal_order) or
    /// [`FrameChanges`](super::FrameChanges).
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn world_transform_at(&self, idx: u32) -> Affine {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.world_transform[idx as usize]
    }

    /// Returns effective visibility at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn effective_visible_at(&self, idx: u32) -> bool {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.effective_visible[idx as usize]
    }

    /// Returns the kind at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn kind_at(&self, idx: u32) -> &NodeKind {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        &self.kind[idx as usize]
    }

    /// Returns the handle for a live raw slot index.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> NodeId {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Removes `idx` from its parent's child list without touching dirty
    /// state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
