// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, NodeId};
use super::store::DisplayStore;

/// An iterator over the direct children of a node, in depth order.
///
/// Created by [`DisplayStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a DisplayStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a DisplayStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(NodeId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}
