// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display-node tree data model.
//!
//! A *node* is one entry in the display tree. Each node has:
//!
//! - An identity ([`NodeId`]) — a generational handle that becomes stale
//!   when the node is destroyed, so use-after-free is caught at the API
//!   level.
//! - Topology — parent, first-child, and sibling links forming an ordered
//!   tree. Sibling order is timeline depth order.
//! - **Local properties** set by callers or the timeline engine:
//!   [`transform`](DisplayStore::set_transform),
//!   [`visibility`](DisplayStore::set_visible), instance name, timeline
//!   depth, and session id.
//! - A [`NodeKind`] payload: the closed variant set (container, shape,
//!   sprite, movie clip, text field).
//! - **Computed properties** produced by
//!   [`evaluate`](DisplayStore::evaluate): `world_transform` and
//!   `effective_visible`.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles;
//! the free list plus generation counters make the store itself the object
//! pool for clip and text instances.

mod evaluate;
mod id;
mod store;
mod traverse;

pub use evaluate::FrameChanges;
pub use id::{GeometryId, INVALID, NodeId, SESSION_NONE, SESSION_SWAP_PENDING};
pub use store::{DisplayStore, NodeKind};
pub use traverse::Children;
