// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-plan production for zoetrope.
//!
//! The renderer proper is an external collaborator: it receives an ordered
//! list of draw items per frame and draws them. This crate walks the
//! evaluated display tree and produces that list — back-to-front,
//! visibility-culled, with world transforms resolved.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod plan;

pub use plan::{DrawItem, DrawSource, FramePlan};
