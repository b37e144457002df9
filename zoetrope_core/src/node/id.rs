// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node and geometry identity types.

use core::fmt;

/// Sentinel value indicating "no node" in index fields.
pub const INVALID: u32 = u32::MAX;

/// Session id of a slot not occupied by any timeline instantiation.
pub const SESSION_NONE: i32 = -1;

/// Session id of a child mid-relocation during a depth swap. Removal side
/// effects are suppressed for this sentinel: the child is being moved, not
/// destroyed.
pub const SESSION_SWAP_PENDING: i32 = -2;

/// A handle to a node in a [`DisplayStore`](super::DisplayStore).
///
/// Contains both a slot index and a generation counter so that stale
/// handles can be detected after a node is destroyed and the slot is
/// reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
    /// Slot index into the store's arrays.
    pub(crate) idx: u32,
    /// Generation counter — must match the store's generation for this slot.
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}

/// An opaque reference to externally built vector geometry.
///
/// Shape buffers are produced and owned by the graphics pipeline; nodes
/// only carry the handle.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeometryId(pub u32);

impl fmt::Debug for GeometryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GeometryId({})", self.0)
    }
}
