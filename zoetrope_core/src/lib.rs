// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Movie-clip timeline playback over a display-node store.
//!
//! `zoetrope_core` provides the data structures and per-tick machinery for
//! Flash-compatible movie-clip playback: a struct-of-arrays display tree
//! with generational handles, a timeline engine that constructs and
//! destroys children deterministically by depth and session identity, a
//! deferred two-phase frame-script scheduler, and a sound-stream
//! synchronizer that reconciles the visual frame clock against streaming
//! audio. It is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! The crate is organized around a frame tick that turns timeline data into
//! incremental display-tree updates:
//!
//! ```text
//!   Scene::tick()
//!       │
//!       ▼
//!   advance_frame ──► Timeline::materialize ──► construct/destroy children
//!       │                                            │
//!       │                  ┌─────────────────────────┘
//!       ▼                  ▼
//!   SoundStreamSync   FrameScriptScheduler ──► user scripts
//!   (skip counts)     (two-phase ordered queues)
//!       │
//!       ▼
//!   DisplayStore::evaluate() ──► FrameChanges ──► renderer
//! ```
//!
//! **[`node`]** — Struct-of-arrays display store with generational handles
//! and a closed [`NodeKind`](node::NodeKind) variant set (container, shape,
//! sprite, movie clip, text field). Local transform and visibility are set
//! by callers; world transforms and effective visibility are computed by
//! evaluation.
//!
//! **[`dirty`]** — Multi-channel dirty tracking via `understory_dirty`.
//! TRANSFORM propagates to descendants; CONTENT is local-only; TOPOLOGY
//! triggers a traversal rebuild.
//!
//! **[`timeline`]** — Keyframe occupancy snapshots and the goto/construct
//! diffing that reuses, constructs, and destroys children by depth and
//! session identity.
//!
//! **[`clip`]** — The [`Scene`](clip::Scene) and per-clip playback state:
//! frame cursor, play/stop, looping, button behavior, and the per-tick
//! advance with audio catch-up.
//!
//! **[`scripts`]** — The deferred two-queue frame-script scheduler.
//!
//! **[`sound`]** — The [`AudioBackend`](sound::AudioBackend) seam, named
//! one-shot sound bookkeeping, and stream synchronization.
//!
//! **[`library`]** — Character definitions that timelines instantiate.
//!
//! **[`trace`]** — [`PlayerSink`](trace::PlayerSink) for frame-loop
//! diagnostics.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod clip;
pub mod dirty;
pub mod library;
pub mod node;
pub mod scripts;
pub mod sound;
pub mod timeline;
pub mod trace;

pub use clip::{MovieClipState, Scene};
pub use node::{DisplayStore, GeometryId, NodeId, NodeKind};
pub use scripts::{FrameScript, FrameScriptScheduler, ScriptError};
pub use timeline::{Keyframe, Placement, Timeline};
