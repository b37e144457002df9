// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The display store uses multi-channel dirty tracking (via
//! [`understory_dirty`]) to propagate invalidation through the node tree.
//! Each channel is an independent category of change.
//!
//! # Propagation semantics
//!
//! - **Propagating** — [`TRANSFORM`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and has dependency
//!   edges from child to parent. Marking a parent dirty marks all
//!   descendants, because world transforms and effective visibility are
//!   inherited. (Visibility changes are routed through [`TRANSFORM`] so
//!   one drain pass recomputes both.)
//!
//! - **Local-only** — [`CONTENT`] is marked with the default policy. Only
//!   the explicitly marked node appears in the drain output: glyph batches,
//!   shape handles, and timeline frame contents are per-node properties.
//!
//! - **Structural** — [`TOPOLOGY`] is marked on topology mutations
//!   (add/remove child, create/destroy node). It triggers a
//!   traversal-order rebuild during evaluation but does not propagate.
//!
//! # Consumption
//!
//! Callers never query dirty state directly. Each
//! [`DisplayStore::evaluate`](crate::node::DisplayStore::evaluate) call
//! drains all channels and surfaces the results as
//! [`FrameChanges`](crate::node::FrameChanges), which the renderer consumes
//! to apply incremental updates.

use understory_dirty::Channel;

/// Transform or visibility changed — requires world transform and effective
/// visibility recomputation for descendants.
pub const TRANSFORM: Channel = Channel::new(0);

/// Node content changed (graphics, glyph batches, frame contents) — no
/// propagation needed.
pub const CONTENT: Channel = Channel::new(1);

/// Tree topology changed — triggers traversal order rebuild.
pub const TOPOLOGY: Channel = Channel::new(2);
