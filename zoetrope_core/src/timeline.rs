// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Timeline data and keyframe materialization.
//!
//! A [`Timeline`] is an ordered list of keyframes. Each keyframe carries an
//! *occupancy snapshot*: the set of `(depth, session id, character)` slots
//! that should exist while the playhead is on that frame, plus an optional
//! frame script. Materializing a frame diffs the snapshot against the
//! clip's current depth/session bookkeeping:
//!
//! - a slot whose depth **and** session id match is left untouched (the
//!   same instantiation spans both frames);
//! - a mismatched or vanished slot has its child torn down;
//! - a new slot gets a child constructed from the clip's potential-instance
//!   cache.
//!
//! Session identity, not character identity, decides reuse: re-entering a
//! frame with a different session id must rebuild the child even when the
//! character is the same.
//!
//! A timeline is owned by exactly one movie clip at a time; reassigning it
//! resets the clip.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::clip::Scene;
use crate::library::CharacterId;
use crate::node::NodeId;
use crate::scripts::FrameScript;
use crate::trace::FrameConstructedEvent;

/// One child slot in a keyframe's occupancy snapshot.
#[derive(Clone, Debug)]
pub struct Placement {
    /// Z-order depth of the slot.
    pub depth: i32,
    /// Instantiation identity. A child survives frame transitions only
    /// while its depth keeps the same session id.
    pub session_id: i32,
    /// Which character occupies the slot.
    pub character: CharacterId,
    /// Instance name for script access, if any.
    pub name: Option<String>,
}

/// One keyframe: an occupancy snapshot plus an optional frame script.
#[derive(Clone, Default)]
pub struct Keyframe {
    /// Child slots live on this frame.
    pub placements: Vec<Placement>,
    /// Script queued when the playhead enters this frame.
    pub script: Option<FrameScript>,
}

impl Keyframe {
    /// Creates an empty keyframe.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an anonymous child slot.
    #[must_use]
    pub fn place(mut self, depth: i32, session_id: i32, character: CharacterId) -> Self {
        self.placements.push(Placement {
            depth,
            session_id,
            character,
            name: None,
        });
        self
    }

    /// Adds a named child slot.
    #[must_use]
    pub fn place_named(
        mut self,
        depth: i32,
        session_id: i32,
        character: CharacterId,
        name: &str,
    ) -> Self {
        self.placements.push(Placement {
            depth,
            session_id,
            character,
            name: Some(String::from(name)),
        });
        self
    }

    /// Attaches the frame script.
    #[must_use]
    pub fn with_script(mut self, script: FrameScript) -> Self {
        self.script = Some(script);
        self
    }
}

impl fmt::Debug for Keyframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keyframe")
            .field("placements", &self.placements)
            .field("has_script", &self.script.is_some())
            .finish()
    }
}

/// An ordered keyframe list with frame labels.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    keyframes: Vec<Keyframe>,
    labels: BTreeMap<String, usize>,
}

impl Timeline {
    /// Creates an empty timeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keyframes.
    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.keyframes.len()
    }

    /// Indices of all keyframes, in playback order.
    #[must_use]
    pub fn keyframe_indices(&self) -> core::ops::Range<usize> {
        0..self.keyframes.len()
    }

    /// Returns a keyframe.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn keyframe(&self, index: usize) -> &Keyframe {
        assert!(
            index < self.keyframes.len(),
            "keyframe index {index} out of range (num_frames {})",
            self.keyframes.len()
        );
        &self.keyframes[index]
    }

    /// Appends a keyframe and returns its index.
    pub fn add_keyframe(&mut self, keyframe: Keyframe) -> usize {
        self.keyframes.push(keyframe);
        self.keyframes.len() - 1
    }

    /// Labels a frame for [`Scene::jump_to_label`].
    pub fn set_label(&mut self, name: &str, frame: usize) {
        self.labels.insert(String::from(name), frame);
    }

    /// Resolves a frame label.
    #[must_use]
    pub fn label_frame(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }
}

impl Scene {
    /// Materializes the keyframe the playhead just advanced onto.
    ///
    /// Skips work when the frame is already constructed, unless `is_reset`
    /// forces it. On reset, the frame script is queued to the scheduler's
    /// pass2 queue: a freshly constructed child's frame-0 script must run
    /// after every script already pending for this tick.
    pub fn construct_next_frame(&mut self, id: NodeId, fire_scripts: bool, is_reset: bool) {
        let (frame, constructed, timeline) = {
            let clip = self.store.clip(id);
            (
                clip.current_frame,
                clip.constructed_keyframe,
                clip.timeline.clone(),
            )
        };
        if frame < 0 || frame as usize >= timeline.num_frames() {
            return;
        }
        if constructed == frame && !is_reset {
            return;
        }
        self.materialize_frame(id, &timeline, frame as usize, fire_scripts, is_reset);
    }

    /// Repositions the playhead onto `frame` and materializes it.
    ///
    /// With `skip_stop` set, the clip's stream stopped-latch is left
    /// untouched (loop wraps restart the stream without re-arming stops).
    pub fn goto_frame(&mut self, id: NodeId, frame: usize, queue_script: bool, skip_stop: bool) {
        if !skip_stop {
            self.reset_stream_stopped(id);
        }
        let timeline = self.store.clip(id).timeline.clone();
        if timeline.num_frames() == 0 {
            return;
        }
        let frame = frame.min(timeline.num_frames() - 1);
        self.store.clip_mut(id).current_frame = frame as i32;
        self.materialize_frame(id, &timeline, frame, queue_script, false);
    }

    /// Seeks to a labeled frame, offset by `offset` frames. Unknown labels
    /// are no-ops.
    pub fn jump_to_label(&mut self, id: NodeId, label: &str, offset: i32) {
        let target = self.store.clip(id).timeline.label_frame(label);
        if let Some(frame) = target {
            self.set_current_frame(id, frame as i32 + offset);
        }
    }

    /// Diffs a keyframe's occupancy snapshot against the clip's live
    /// children and applies the difference.
    fn materialize_frame(
        &mut self,
        id: NodeId,
        timeline: &Rc<Timeline>,
        frame: usize,
        fire_scripts: bool,
        pass2: bool,
    ) {
        let target = timeline.keyframe(frame);

        // The clip's own script is queued before any child construction,
        // so scripts of children constructed by this very materialization
        // land behind it in the same flush. Scripts discovered while a
        // flush is executing (or during a reset-driven construction) go to
        // pass2 so they cannot jump ahead of siblings still pending.
        if fire_scripts && let Some(script) = &target.script {
            if pass2 || self.scripts.is_executing() {
                self.scripts.queue_script_pass2(id, script.clone());
            } else {
                self.scripts.queue_script(id, script.clone());
            }
        }

        let mut expected: BTreeMap<i32, &Placement> = BTreeMap::new();
        for placement in &target.placements {
            expected.insert(placement.depth, placement);
        }

        // Pass 1: tear down slots whose depth or session no longer match.
        let current: Vec<(i32, i32)> = self
            .store
            .clip(id)
            .depth_sessions
            .iter()
            .map(|(&d, &s)| (d, s))
            .collect();
        let mut removed = 0;
        for (depth, session) in current {
            let keep = expected
                .get(&depth)
                .is_some_and(|p| p.session_id == session);
            if keep {
                continue;
            }
            let child = self.store.clip(id).session_children.get(&session).copied();
            match child {
                Some(child) => {
                    self.remove_timeline_child(id, child);
                    removed += 1;
                }
                None => {
                    self.store.clip_mut(id).depth_sessions.remove(&depth);
                }
            }
        }

        // Pass 2: construct newly appearing slots.
        let mut placed = 0;
        for placement in &target.placements {
            let occupied = self.store.clip(id).depth_sessions.get(&placement.depth)
                == Some(&placement.session_id);
            if occupied {
                continue;
            }
            let child = self.get_potential_child_instance(id, placement.character);
            if let Some(name) = &placement.name {
                self.store.set_name(child, Some(name.clone()));
            }
            self.add_timeline_child_at(id, child, placement.depth, placement.session_id);
            if let Some(name) = &placement.name {
                self.register_script_object(id, name, child);
            }
            placed += 1;
        }

        self.store.clip_mut(id).constructed_keyframe = frame as i32;
        self.store.mark_content(id);

        self.emit_frame_constructed(FrameConstructedEvent {
            clip: id.index(),
            frame: frame as u32,
            placed,
            removed,
        });
    }
}
