// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The scene and per-clip playback state.
//!
//! A [`Scene`] owns the display store, the character library, the frame
//! script scheduler, and the sound registry — everything that the original
//! player kept in globals lives here, injected and testable.
//!
//! A movie clip is a display node whose [`MovieClipState`] carries the
//! playhead, the depth/session bookkeeping, and the potential-instance
//! cache. Clips advance once per tick; audio catch-up may repeat the
//! internal advance (with a script flush between repeats) without
//! re-walking children.
//!
//! # Frame-skip flag
//!
//! A clip freshly constructed or explicitly repositioned this tick must
//! not be advanced again by the generic tick before its constructors have
//! run. Seeks and resets set `skip_advance`; every internal advance pass
//! clears it.

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Affine;
use zoetrope_text::input::{Key, Modifiers};

use crate::library::{CharacterId, Library};
use crate::node::{
    DisplayStore, NodeId, NodeKind, SESSION_NONE, SESSION_SWAP_PENDING,
};
use crate::scripts::{FrameScriptScheduler, ScriptError};
use crate::sound::{AudioBackend, SoundHandle, SoundId, SoundMixer, SoundStreamSync};
use crate::timeline::Timeline;
use crate::trace::{
    FrameConstructedEvent, PlayerSink, ScriptErrorEvent, SeekEvent, SoundSkipEvent, TickEvent,
};

/// Pointer states a button timeline reacts to.
///
/// A button clip's keyframes are, by convention, 0 = up, 1 = over,
/// 2 = down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ButtonState {
    /// Pointer left the button.
    Out,
    /// Pointer hovers the button.
    Over,
    /// Pointer pressed on the button.
    Down,
    /// Pointer released over the button.
    Up,
}

/// Per-clip playback state.
#[derive(Debug)]
pub struct MovieClipState {
    pub(crate) timeline: Rc<Timeline>,
    pub(crate) current_frame: i32,
    pub(crate) constructed_keyframe: i32,
    pub(crate) is_playing: bool,
    pub(crate) skip_advance: bool,
    pub(crate) loop_enabled: bool,
    pub(crate) doing_swap: bool,

    /// Authoritative record of which session occupies each depth.
    pub(crate) depth_sessions: BTreeMap<i32, i32>,
    /// Reverse map: live child by instantiation identity.
    pub(crate) session_children: BTreeMap<i32, NodeId>,
    /// One cached template instance per character, reused across frame
    /// re-entries.
    pub(crate) potential_instances: BTreeMap<CharacterId, NodeId>,
    /// Explicit name → node bindings for script access.
    pub(crate) script_objects: BTreeMap<String, NodeId>,

    pub(crate) sounds: BTreeMap<SoundId, SoundHandle>,
    pub(crate) sound_volume: f64,
    pub(crate) stream: Option<SoundStreamSync>,
    pub(crate) skip_frames_for_stream: i32,

    pub(crate) is_button: bool,
    pub(crate) button_enabled: bool,
}

impl MovieClipState {
    /// Creates playback state for the given timeline.
    #[must_use]
    pub fn new(timeline: Rc<Timeline>) -> Self {
        Self {
            timeline,
            current_frame: -1,
            constructed_keyframe: -1,
            is_playing: true,
            skip_advance: false,
            loop_enabled: true,
            doing_swap: false,
            depth_sessions: BTreeMap::new(),
            session_children: BTreeMap::new(),
            potential_instances: BTreeMap::new(),
            script_objects: BTreeMap::new(),
            sounds: BTreeMap::new(),
            sound_volume: 1.0,
            stream: None,
            skip_frames_for_stream: 0,
            is_button: false,
            button_enabled: true,
        }
    }

    /// The timeline this clip plays.
    #[must_use]
    pub fn timeline(&self) -> &Rc<Timeline> {
        &self.timeline
    }

    /// Current playhead position, or -1 before the first construction.
    #[must_use]
    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    /// Whether the playhead advances on ticks.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Whether reaching the last keyframe wraps to frame 0.
    #[must_use]
    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    /// Enables or disables looping.
    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    /// Session occupying `depth`, if any.
    #[must_use]
    pub fn session_from_depth(&self, depth: i32) -> Option<i32> {
        self.depth_sessions.get(&depth).copied()
    }

    /// Live child with the given session id, if any.
    #[must_use]
    pub fn child_at_session(&self, session: i32) -> Option<NodeId> {
        self.session_children.get(&session).copied()
    }

    /// Iterates the (depth, session) occupancy records.
    pub fn depths(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.depth_sessions.iter().map(|(&d, &s)| (d, s))
    }

    /// Current sound volume.
    #[must_use]
    pub fn sound_volume(&self) -> f64 {
        self.sound_volume
    }

    /// Whether the clip acts as a button.
    #[must_use]
    pub fn is_button(&self) -> bool {
        self.is_button
    }
}

/// The playback world: display store, library, scheduler, and sound
/// registry under one owner.
pub struct Scene {
    /// The display-node store.
    pub store: DisplayStore,
    /// Character definitions.
    pub library: Library,
    /// The deferred frame-script scheduler.
    pub scripts: FrameScriptScheduler,
    /// Scene-wide registry of live one-shot sounds.
    pub mixer: SoundMixer,
    root: Option<NodeId>,
    sink: Option<alloc::boxed::Box<dyn PlayerSink>>,
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("store", &self.store)
            .field("scripts", &self.scripts)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: DisplayStore::new(),
            library: Library::new(),
            scripts: FrameScriptScheduler::new(),
            mixer: SoundMixer::new(),
            root: None,
            sink: None,
        }
    }

    /// The distinguished root clip, if set.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Declares the root clip. The root is exempt from the scheduler's
    /// detached-clip check.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Installs a diagnostics sink.
    pub fn set_trace_sink(&mut self, sink: alloc::boxed::Box<dyn PlayerSink>) {
        self.sink = Some(sink);
    }

    /// Removes and returns the diagnostics sink.
    pub fn take_trace_sink(&mut self) -> Option<alloc::boxed::Box<dyn PlayerSink>> {
        self.sink.take()
    }

    pub(crate) fn emit_tick(&mut self, e: TickEvent) {
        if let Some(sink) = &mut self.sink {
            sink.on_tick(&e);
        }
    }

    pub(crate) fn emit_seek(&mut self, e: SeekEvent) {
        if let Some(sink) = &mut self.sink {
            sink.on_seek(&e);
        }
    }

    pub(crate) fn emit_frame_constructed(&mut self, e: FrameConstructedEvent) {
        if let Some(sink) = &mut self.sink {
            sink.on_frame_constructed(&e);
        }
    }

    pub(crate) fn emit_script_error(&mut self, e: ScriptErrorEvent) {
        if let Some(sink) = &mut self.sink {
            sink.on_script_error(&e);
        }
    }

    pub(crate) fn emit_sound_skip(&mut self, e: SoundSkipEvent) {
        if let Some(sink) = &mut self.sink {
            sink.on_sound_skip(&e);
        }
    }

    // -- Clip lifecycle ----------------------------------------------------

    /// Creates a movie-clip node playing the given timeline.
    pub fn create_movie_clip(&mut self, timeline: Rc<Timeline>) -> NodeId {
        self.store.create_node(NodeKind::MovieClip(alloc::boxed::Box::new(
            MovieClipState::new(timeline),
        )))
    }

    /// Hands a clip a new timeline, resetting its playback state.
    pub fn set_clip_timeline(&mut self, id: NodeId, timeline: Rc<Timeline>) {
        if Rc::ptr_eq(&self.store.clip(id).timeline, &timeline) {
            return;
        }
        self.store.clip_mut(id).timeline = timeline;
        self.reset_clip(id, false);
    }

    /// Re-initializes a clip's frame state. With `fire_scripts`, frame 0 is
    /// constructed and its script queued; without, the clip is left
    /// unconstructed (timeline handoff).
    pub fn reset_clip(&mut self, id: NodeId, fire_scripts: bool) {
        self.reset_stream_stopped(id);
        self.free_from_script(id);
        self.store.clip_mut(id).constructed_keyframe = -1;

        let children: Vec<NodeId> = self.store.children(id).collect();
        for child in children.into_iter().rev() {
            self.remove_timeline_child(id, child);
        }

        if fire_scripts {
            let (num_frames, doing_swap) = {
                let clip = self.store.clip(id);
                (clip.timeline.num_frames(), clip.doing_swap)
            };
            self.store.clip_mut(id).is_playing = num_frames > 1;
            if num_frames > 0 {
                self.store.clip_mut(id).current_frame = 0;
                self.construct_next_frame(id, !doing_swap, true);
            } else {
                self.store.clip_mut(id).current_frame = -1;
            }
        }

        // The playhead was just positioned; the generic tick must not move
        // it again before this frame's constructors have run.
        self.store.clip_mut(id).skip_advance = true;
    }

    /// Tears down a node and its subtree, recycling every slot. Cached
    /// potential instances of clips are disposed along with them.
    pub fn dispose_node(&mut self, id: NodeId) {
        if !self.store.is_alive(id) {
            return;
        }
        let children: Vec<NodeId> = self.store.children(id).collect();
        for child in children.into_iter().rev() {
            self.dispose_node(child);
        }

        if self.store.is_movie_clip(id) {
            let cached: Vec<NodeId> = {
                let clip = self.store.clip_mut(id);
                clip.depth_sessions.clear();
                clip.session_children.clear();
                clip.script_objects.clear();
                core::mem::take(&mut clip.potential_instances)
                    .into_values()
                    .collect()
            };
            for node in cached {
                if self.store.is_alive(node) && self.store.parent(node).is_none() {
                    self.dispose_node(node);
                }
            }
        }

        if self.store.parent(id).is_some() {
            self.store.remove_from_parent(id);
        }
        self.store.destroy_node(id);
    }

    // -- Playback ----------------------------------------------------------

    /// Starts playback. Clips with at most one keyframe never play.
    pub fn play_clip(&mut self, id: NodeId) {
        if self.store.clip(id).timeline.num_frames() > 1 {
            self.store.clip_mut(id).is_playing = true;
        }
    }

    /// Stops playback, holding the current frame.
    pub fn stop_clip(&mut self, id: NodeId) {
        self.reset_stream_stopped(id);
        self.store.clip_mut(id).is_playing = false;
    }

    /// Repositions the playhead.
    ///
    /// Out-of-range values clamp to the nearest keyframe boundary; seeking
    /// past the end lands on the last frame *without* firing its script
    /// (an out-of-range frame number is not a keyframe boundary). Clips
    /// with no keyframes ignore seeks entirely.
    pub fn set_current_frame(&mut self, id: NodeId, value: i32) {
        self.reset_stream_stopped(id);
        let num_frames = self.store.clip(id).timeline.num_frames() as i32;
        if num_frames == 0 {
            return;
        }

        let mut queue_script = true;
        let resolved = if value < 0 {
            0
        } else if value >= num_frames {
            queue_script = false;
            num_frames - 1
        } else {
            value
        };

        self.emit_seek(SeekEvent {
            clip: id.index(),
            requested: value,
            resolved,
            fires_scripts: queue_script,
        });

        self.store.clip_mut(id).skip_advance = true;
        if self.store.clip(id).current_frame == resolved {
            return;
        }
        self.store.clip_mut(id).current_frame = resolved;
        self.goto_frame(id, resolved as usize, queue_script, false);
    }

    /// Advances the whole scene one tick and flushes frame scripts.
    ///
    /// # Errors
    ///
    /// Propagates the first frame-script failure.
    pub fn tick(&mut self, audio: &mut dyn AudioBackend) -> Result<(), ScriptError> {
        self.emit_tick(TickEvent {
            root: self.root.map_or(u32::MAX, NodeId::index),
        });
        if let Some(root) = self.root
            && self.store.is_alive(root)
        {
            self.advance_frame(audio, root)?;
        }
        self.run_frame_scripts()
    }

    /// Advances one node for this tick: the clip's own internal advance
    /// (gated by the stream-skip counter), a depth-first walk of its
    /// children in ascending order, then the audio catch-up loop.
    ///
    /// # Errors
    ///
    /// Propagates script failures from catch-up flushes.
    pub fn advance_frame(
        &mut self,
        audio: &mut dyn AudioBackend,
        id: NodeId,
    ) -> Result<(), ScriptError> {
        if !self.store.is_alive(id) {
            return Ok(());
        }

        if !self.store.is_movie_clip(id) {
            let children: Vec<NodeId> = self.store.children(id).collect();
            for child in children {
                self.advance_frame(audio, child)?;
            }
            return Ok(());
        }

        if self.store.clip(id).skip_frames_for_stream == 0 {
            self.advance_frame_internal(id);
        }

        let children: Vec<NodeId> = self.store.children(id).collect();
        for child in children {
            self.advance_frame(audio, child)?;
        }

        // Audio catch-up: repeat internal advances (draining the script
        // queue between each) until the stream reports sync. The child
        // walk above is not repeated for partial steps.
        let frame = self.store.clip(id).current_frame.max(0) as u32;
        let mut skip = self.sync_sounds(audio, id, frame);
        while skip > 0 {
            self.run_frame_scripts()?;
            self.advance_frame_internal(id);
            let frame = self.store.clip(id).current_frame.max(0) as u32;
            skip = self.sync_sounds(audio, id, frame);
        }
        self.store.clip_mut(id).skip_frames_for_stream = skip;
        Ok(())
    }

    /// One internal advance: move the playhead a single step, wrapping or
    /// stopping at the last keyframe. Clears the frame-skip flag.
    fn advance_frame_internal(&mut self, id: NodeId) {
        let (num_frames, is_playing, skip_advance, current, looping) = {
            let clip = self.store.clip(id);
            (
                clip.timeline.num_frames() as i32,
                clip.is_playing,
                clip.skip_advance,
                clip.current_frame,
                clip.loop_enabled,
            )
        };

        if num_frames > 0 && is_playing && !skip_advance {
            if current == num_frames - 1 {
                if looping {
                    if current != 0 {
                        self.reset_stream_stopped(id);
                        self.store.clip_mut(id).current_frame = 0;
                        self.goto_frame(id, 0, true, true);
                    }
                } else {
                    // End of a non-looping timeline: stop silently.
                    self.store.clip_mut(id).is_playing = false;
                }
            } else {
                self.store.clip_mut(id).current_frame = current + 1;
                self.construct_next_frame(id, true, false);
            }
        }

        self.store.clip_mut(id).skip_advance = false;
    }

    // -- Timeline child bookkeeping ----------------------------------------

    /// Places a child under timeline control at `depth` with `session`.
    ///
    /// Records the depth/session mapping, clears stale script bindings on
    /// the child, and — unless a depth swap is in progress — resets the
    /// child's transform and visibility (and, for clips and text fields,
    /// their content) before inserting it into the display list.
    pub fn add_timeline_child_at(
        &mut self,
        parent: NodeId,
        child: NodeId,
        depth: i32,
        session: i32,
    ) -> NodeId {
        self.store.clip_mut(parent).depth_sessions.insert(depth, session);
        self.store.set_session_id(child, session);
        self.store.set_timeline_owned(child, true);
        self.free_from_script(child);

        let doing_swap = self.store.clip(parent).doing_swap;
        if !doing_swap {
            self.store.reset_node(child);
            if self.store.is_movie_clip(child) {
                self.reset_clip(child, true);
            } else if matches!(self.store.kind(child), NodeKind::Text(_)) {
                self.store.text_mut(child).reset();
            }
        }

        self.store.add_child_at_depth(parent, child, depth);
        self.store.clip_mut(parent).session_children.insert(session, child);
        child
    }

    /// Removes a timeline child, clearing both occupancy maps before the
    /// node is detached. During a depth swap the session id is set to the
    /// swap-pending sentinel and script unbinding is suppressed — the
    /// child is being relocated, not destroyed.
    pub fn remove_timeline_child(&mut self, parent: NodeId, child: NodeId) {
        let doing_swap = self.store.clip(parent).doing_swap;
        if !doing_swap {
            self.free_from_script(child);
            self.unregister_script_object(parent, child);
        }

        let session = self.store.session_id(child);
        let depth = self.store.depth_id(child);
        {
            let clip = self.store.clip_mut(parent);
            clip.session_children.remove(&session);
            if clip.depth_sessions.get(&depth) == Some(&session) {
                clip.depth_sessions.remove(&depth);
            }
        }
        self.store.set_session_id(
            child,
            if doing_swap {
                SESSION_SWAP_PENDING
            } else {
                SESSION_NONE
            },
        );
        self.store.remove_from_parent(child);
    }

    /// Exchanges the depths (and session bookkeeping) of two children,
    /// atomically from the perspective of any observer. Transforms are not
    /// disturbed.
    pub fn swap_children_at(&mut self, parent: NodeId, index1: usize, index2: usize) {
        let children: Vec<NodeId> = self.store.children(parent).collect();
        let a = children[index1];
        let b = children[index2];

        let depth_a = self.store.depth_id(a);
        let depth_b = self.store.depth_id(b);
        let session_a = self.store.session_id(a);
        let session_b = self.store.session_id(b);

        self.store.clip_mut(parent).doing_swap = true;
        self.remove_timeline_child(parent, a);
        self.remove_timeline_child(parent, b);
        self.add_timeline_child_at(parent, a, depth_b, session_a);
        self.add_timeline_child_at(parent, b, depth_a, session_b);
        self.store.clip_mut(parent).doing_swap = false;
    }

    /// Moves `child` to `depth`. An existing occupant of that depth takes
    /// over the child's old depth.
    pub fn swap_depths(&mut self, parent: NodeId, child: NodeId, depth: i32) {
        let current_depth = self.store.depth_id(child);
        if current_depth == depth {
            return;
        }
        let existing = self.store.child_at_depth(parent, depth);
        let session_child = self.store.session_id(child);

        self.store.clip_mut(parent).doing_swap = true;
        self.remove_timeline_child(parent, child);
        if let Some(other) = existing {
            let session_other = self.store.session_id(other);
            self.remove_timeline_child(parent, other);
            self.add_timeline_child_at(parent, other, current_depth, session_other);
        }
        self.add_timeline_child_at(parent, child, depth, session_child);
        self.store.clip_mut(parent).doing_swap = false;
    }

    /// Returns the clip's cached instance for `character`, instantiating a
    /// fresh one when the cache is empty, stale, mid-swap, already
    /// attached elsewhere, or the character is marked clone-per-instance.
    pub fn get_potential_child_instance(&mut self, id: NodeId, character: CharacterId) -> NodeId {
        let cached = self
            .store
            .clip(id)
            .potential_instances
            .get(&character)
            .copied();
        let needs_new = match cached {
            None => true,
            Some(node) => {
                !self.store.is_alive(node)
                    || self.store.session_id(node) == SESSION_SWAP_PENDING
                    || self.store.parent(node).is_some()
                    || self.library.character(character).clone_per_instance
            }
        };
        if needs_new {
            let node = self.library.instantiate(&mut self.store, character);
            self.store
                .clip_mut(id)
                .potential_instances
                .insert(character, node);
            node
        } else {
            cached.unwrap()
        }
    }

    // -- Script object registry --------------------------------------------

    /// Binds `name` to `child` on the parent clip's script registry.
    pub fn register_script_object(&mut self, parent: NodeId, name: &str, child: NodeId) {
        self.store
            .clip_mut(parent)
            .script_objects
            .insert(String::from(name), child);
    }

    /// Removes every binding to `child` from the parent clip's registry.
    pub fn unregister_script_object(&mut self, parent: NodeId, child: NodeId) {
        if self.store.is_movie_clip(parent) {
            self.store
                .clip_mut(parent)
                .script_objects
                .retain(|_, bound| *bound != child);
        }
    }

    /// Looks up a name binding on a clip.
    #[must_use]
    pub fn script_object(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.store.clip(parent).script_objects.get(name).copied()
    }

    /// Clears script-assigned state on a node, so stale bindings from a
    /// previous occupant of its slot cannot leak.
    pub fn free_from_script(&mut self, id: NodeId) {
        if self.store.is_movie_clip(id) {
            self.store.clip_mut(id).script_objects.clear();
        }
    }

    // -- Button behavior ---------------------------------------------------

    /// Turns the clip into a button: playback stops and pointer states
    /// drive the playhead.
    pub fn make_button(&mut self, id: NodeId) {
        self.store.clip_mut(id).is_button = true;
        self.stop_clip(id);
    }

    /// Enables or disables button reactions.
    pub fn set_button_enabled(&mut self, id: NodeId, enabled: bool) {
        self.store.clip_mut(id).button_enabled = enabled;
    }

    /// Snaps a disabled button back to its up frame.
    pub fn button_reset(&mut self, id: NodeId) {
        let clip = self.store.clip(id);
        if clip.is_button && !clip.button_enabled {
            self.set_current_frame(id, 0);
        }
    }

    /// Drives a button timeline from a pointer state transition.
    pub fn set_button_state(&mut self, id: NodeId, state: ButtonState) {
        let enabled = self.store.clip(id).button_enabled;
        let target = match state {
            ButtonState::Out => 0,
            ButtonState::Over => i32::from(enabled),
            ButtonState::Down => {
                if enabled {
                    2
                } else {
                    0
                }
            }
            ButtonState::Up => {
                if self.store.clip(id).current_frame == 0 {
                    0
                } else {
                    1
                }
            }
        };
        self.set_current_frame(id, target);
    }

    // -- Text integration --------------------------------------------------

    /// Routes a key event to a text-field node and invalidates its content
    /// on change. Returns whether the text changed.
    pub fn dispatch_key(&mut self, id: NodeId, key: Key, mods: Modifiers) -> bool {
        let changed = self.store.text_mut(id).handle_key(key, mods);
        self.store.mark_content(id);
        changed
    }

    /// Re-runs a text field's layout pipeline, applying any auto-size
    /// anchor shift to the node transform.
    pub fn reconstruct_text(&mut self, id: NodeId, build_graphics: bool) {
        let field = self.store.text_mut(id);
        field.reconstruct(build_graphics);
        let shift = field.take_position_shift();
        if shift != 0.0 {
            let local = self.store.local_transform(id);
            self.store
                .set_transform(id, Affine::translate((shift, 0.0)) * local);
        }
        self.store.mark_content(id);
    }

    /// Restores timeline-cloned text fields to their template text,
    /// recursing through nested clips.
    pub fn reset_text_clones(&mut self, id: NodeId) {
        let cached: Vec<NodeId> = self
            .store
            .clip(id)
            .potential_instances
            .values()
            .copied()
            .collect();
        for node in cached {
            if !self.store.is_alive(node) {
                continue;
            }
            match self.store.kind(node) {
                NodeKind::Text(_) => self.store.text_mut(node).reset(),
                NodeKind::MovieClip(_) => self.reset_text_clones(node),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::library::{Character, CharacterDef};
    use crate::node::GeometryId;
    use crate::sound::testing::MockAudio;
    use crate::sound::{NullAudio, StreamBlock, StreamInfo};
    use crate::timeline::Keyframe;
    use crate::trace::FrameConstructedEvent;

    /// Records frame constructions into shared state.
    struct ConstructLog(Rc<RefCell<Vec<(u32, u32)>>>);

    impl PlayerSink for ConstructLog {
        fn on_frame_constructed(&mut self, e: &FrameConstructedEvent) {
            self.0.borrow_mut().push((e.clip, e.frame));
        }
    }

    fn shape_char(scene: &mut Scene) -> CharacterId {
        scene
            .library
            .register(Character::new(CharacterDef::Shape(GeometryId(0))))
    }

    /// A root clip whose timeline has `frames` empty keyframes.
    fn scene_with_frames(frames: usize) -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let mut timeline = Timeline::new();
        for _ in 0..frames {
            timeline.add_keyframe(Keyframe::new());
        }
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);
        (scene, root)
    }

    fn assert_depth_session_consistent(scene: &Scene, clip: NodeId) {
        for (depth, session) in scene.store.clip(clip).depths() {
            let child = scene
                .store
                .child_at_depth(clip, depth)
                .unwrap_or_else(|| panic!("no child at depth {depth}"));
            assert_eq!(
                scene.store.session_id(child),
                session,
                "depth {depth}: display-list session must match the map"
            );
            assert_eq!(
                scene.store.clip(clip).child_at_session(session),
                Some(child),
                "session {session}: reverse map must point at the occupant"
            );
        }
    }

    // -- Frame clamp (seek) -------------------------------------------------

    #[test]
    fn seek_clamps_past_end_without_firing_scripts() {
        let mut scene = Scene::new();
        let fired = Rc::new(RefCell::new(0));
        let fired2 = fired.clone();
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new());
        timeline.add_keyframe(Keyframe::new());
        timeline.add_keyframe(Keyframe::new().with_script(Rc::new(move |_, _| {
            *fired2.borrow_mut() += 1;
            Ok(())
        })));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);
        scene.run_frame_scripts().unwrap();

        scene.set_current_frame(root, 99);
        assert_eq!(scene.store.clip(root).current_frame(), 2);
        scene.run_frame_scripts().unwrap();
        assert_eq!(*fired.borrow(), 0, "past-end seek must not fire scripts");

        // An in-range seek to the same frame does fire.
        scene.set_current_frame(root, 0);
        scene.set_current_frame(root, 2);
        scene.run_frame_scripts().unwrap();
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn seek_clamps_negative_to_zero() {
        let (mut scene, root) = scene_with_frames(3);
        scene.set_current_frame(root, 1);
        scene.set_current_frame(root, -7);
        assert_eq!(scene.store.clip(root).current_frame(), 0);
    }

    #[test]
    fn zero_keyframe_clip_ignores_seeks_and_never_plays() {
        let (mut scene, root) = scene_with_frames(0);
        assert_eq!(scene.store.clip(root).current_frame(), -1);
        assert!(!scene.store.clip(root).is_playing());
        scene.set_current_frame(root, 3);
        assert_eq!(scene.store.clip(root).current_frame(), -1);
        scene.play_clip(root);
        assert!(!scene.store.clip(root).is_playing());
    }

    #[test]
    fn single_keyframe_clip_never_enters_playing() {
        let (scene, root) = scene_with_frames(1);
        assert!(!scene.store.clip(root).is_playing());
    }

    // -- Timeline construction ---------------------------------------------

    #[test]
    fn frame_zero_construction_places_children_by_depth() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(3, 100, shape).place(1, 101, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let children: Vec<NodeId> = scene.store.children(root).collect();
        assert_eq!(children.len(), 2);
        // Sibling order follows depth, not placement order.
        assert_eq!(scene.store.depth_id(children[0]), 1);
        assert_eq!(scene.store.depth_id(children[1]), 3);
        assert_depth_session_consistent(&scene, root);
    }

    #[test]
    fn matching_session_survives_frame_transitions() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape));
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let child = scene.store.child_at_depth(root, 1).unwrap();
        // Scripted state on the child survives the transition because the
        // same instantiation spans both frames.
        scene.store.set_transform(child, Affine::translate((9.0, 0.0)));

        let mut audio = NullAudio;
        scene.tick(&mut audio).unwrap(); // clears skip_advance
        scene.tick(&mut audio).unwrap(); // frame 1
        assert_eq!(scene.store.clip(root).current_frame(), 1);
        assert_eq!(scene.store.child_at_depth(root, 1), Some(child));
        assert_eq!(
            scene.store.local_transform(child),
            Affine::translate((9.0, 0.0))
        );
        assert_depth_session_consistent(&scene, root);
    }

    #[test]
    fn changed_session_rebuilds_the_slot() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape));
        timeline.add_keyframe(Keyframe::new().place(1, 200, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let child = scene.store.child_at_depth(root, 1).unwrap();
        scene.store.set_transform(child, Affine::translate((9.0, 0.0)));

        let mut audio = NullAudio;
        scene.tick(&mut audio).unwrap();
        scene.tick(&mut audio).unwrap();

        let occupant = scene.store.child_at_depth(root, 1).unwrap();
        assert_eq!(scene.store.session_id(occupant), 200);
        // The slot was torn down and reconstructed: transform reset.
        assert_eq!(scene.store.local_transform(occupant), Affine::IDENTITY);
        assert_depth_session_consistent(&scene, root);
    }

    #[test]
    fn vanished_placement_detaches_the_child() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape).place(2, 101, shape));
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);
        assert_eq!(scene.store.num_children(root), 2);

        let mut audio = NullAudio;
        scene.tick(&mut audio).unwrap();
        scene.tick(&mut audio).unwrap();
        assert_eq!(scene.store.num_children(root), 1);
        assert_eq!(scene.store.clip(root).session_from_depth(2), None);
        assert_depth_session_consistent(&scene, root);
    }

    #[test]
    fn named_placement_registers_script_object() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place_named(1, 100, shape, "door"));
        timeline.add_keyframe(Keyframe::new());
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let child = scene.store.child_at_depth(root, 1).unwrap();
        assert_eq!(scene.script_object(root, "door"), Some(child));
        assert_eq!(scene.store.name(child), Some("door"));

        // Removal unbinds the name.
        let mut audio = NullAudio;
        scene.tick(&mut audio).unwrap();
        scene.tick(&mut audio).unwrap();
        assert_eq!(scene.script_object(root, "door"), None);
    }

    // -- Looping ------------------------------------------------------------

    #[test]
    fn looping_clip_visits_every_keyframe_once_per_cycle() {
        let (mut scene, root) = scene_with_frames(3);
        let log = Rc::new(RefCell::new(Vec::new()));
        scene.set_trace_sink(Box::new(ConstructLog(log.clone())));

        let mut audio = NullAudio;
        scene.tick(&mut audio).unwrap(); // skip_advance tick
        scene.tick(&mut audio).unwrap(); // -> 1
        scene.tick(&mut audio).unwrap(); // -> 2
        scene.tick(&mut audio).unwrap(); // -> wraps to 0

        assert_eq!(scene.store.clip(root).current_frame(), 0);
        let frames: Vec<u32> = log.borrow().iter().map(|&(_, f)| f).collect();
        assert_eq!(frames, [1, 2, 0], "each keyframe visited exactly once");
        assert!(scene.store.clip(root).is_playing());
    }

    #[test]
    fn non_looping_clip_stops_at_last_frame() {
        let (mut scene, root) = scene_with_frames(3);
        scene.store.clip_mut(root).set_loop(false);

        let mut audio = NullAudio;
        for _ in 0..6 {
            scene.tick(&mut audio).unwrap();
        }
        assert_eq!(scene.store.clip(root).current_frame(), 2);
        assert!(!scene.store.clip(root).is_playing(), "silent stop");

        // Further ticks are no-ops.
        scene.tick(&mut audio).unwrap();
        assert_eq!(scene.store.clip(root).current_frame(), 2);
    }

    #[test]
    fn stop_and_play_control_advance() {
        let (mut scene, root) = scene_with_frames(4);
        let mut audio = NullAudio;
        scene.tick(&mut audio).unwrap();
        scene.stop_clip(root);
        scene.tick(&mut audio).unwrap();
        scene.tick(&mut audio).unwrap();
        assert_eq!(scene.store.clip(root).current_frame(), 0);

        scene.play_clip(root);
        scene.tick(&mut audio).unwrap();
        assert_eq!(scene.store.clip(root).current_frame(), 1);
    }

    // -- Script ordering -----------------------------------------------------

    #[test]
    fn parent_script_runs_before_constructed_childs_script() {
        let mut scene = Scene::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_b = log.clone();
        let mut timeline_b = Timeline::new();
        timeline_b.add_keyframe(Keyframe::new().with_script(Rc::new(move |_, _| {
            log_b.borrow_mut().push("B");
            Ok(())
        })));
        let char_b = scene
            .library
            .register(Character::new(CharacterDef::MovieClip(Rc::new(timeline_b))));

        let log_a = log.clone();
        let mut timeline_a = Timeline::new();
        timeline_a.add_keyframe(
            Keyframe::new()
                .place(1, 100, char_b)
                .with_script(Rc::new(move |_, _| {
                    log_a.borrow_mut().push("A");
                    Ok(())
                })),
        );

        let root = scene.create_movie_clip(Rc::new(timeline_a));
        scene.set_root(root);
        scene.reset_clip(root, true);
        scene.run_frame_scripts().unwrap();

        assert_eq!(*log.borrow(), ["A", "B"]);
    }

    #[test]
    fn script_constructed_child_script_runs_after_pending_scripts() {
        let mut scene = Scene::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let log_c = log.clone();
        let mut timeline_c = Timeline::new();
        timeline_c.add_keyframe(Keyframe::new().with_script(Rc::new(move |_, _| {
            log_c.borrow_mut().push("child");
            Ok(())
        })));
        let char_c = scene
            .library
            .register(Character::new(CharacterDef::MovieClip(Rc::new(timeline_c))));

        let log_1 = log.clone();
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().with_script(Rc::new(
            move |scene: &mut Scene, clip| {
                log_1.borrow_mut().push("first");
                // Construct a child mid-execution; its frame-0 script must
                // not jump ahead of scripts already queued.
                let child = scene.get_potential_child_instance(clip, char_c);
                scene.add_timeline_child_at(clip, child, 5, 500);
                Ok(())
            },
        )));

        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);
        let log_2 = log.clone();
        scene.scripts.queue_script(
            root,
            Rc::new(move |_, _| {
                log_2.borrow_mut().push("second");
                Ok(())
            }),
        );
        scene.run_frame_scripts().unwrap();

        assert_eq!(*log.borrow(), ["first", "second", "child"]);
    }

    // -- Swaps ---------------------------------------------------------------

    #[test]
    fn swap_children_at_exchanges_depths_and_keeps_transforms() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape).place(2, 200, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let a = scene.store.child_at_depth(root, 1).unwrap();
        let b = scene.store.child_at_depth(root, 2).unwrap();
        scene.store.set_transform(a, Affine::translate((5.0, 0.0)));

        scene.swap_children_at(root, 0, 1);

        assert_eq!(scene.store.child_at_depth(root, 1), Some(b));
        assert_eq!(scene.store.child_at_depth(root, 2), Some(a));
        assert_eq!(scene.store.clip(root).session_from_depth(2), Some(100));
        assert_eq!(scene.store.clip(root).session_from_depth(1), Some(200));
        // A swap relocates, it does not reset.
        assert_eq!(
            scene.store.local_transform(a),
            Affine::translate((5.0, 0.0))
        );
        assert_depth_session_consistent(&scene, root);
    }

    #[test]
    fn swap_depths_with_occupant_exchanges_slots() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape).place(2, 200, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let a = scene.store.child_at_depth(root, 1).unwrap();
        let b = scene.store.child_at_depth(root, 2).unwrap();

        scene.swap_depths(root, a, 2);
        assert_eq!(scene.store.child_at_depth(root, 2), Some(a));
        assert_eq!(scene.store.child_at_depth(root, 1), Some(b));
        assert_depth_session_consistent(&scene, root);
    }

    #[test]
    fn swap_depths_to_empty_slot_moves_the_child() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let a = scene.store.child_at_depth(root, 1).unwrap();
        scene.swap_depths(root, a, 9);
        assert_eq!(scene.store.child_at_depth(root, 9), Some(a));
        assert_eq!(scene.store.clip(root).session_from_depth(1), None);
        assert_depth_session_consistent(&scene, root);
    }

    // -- Labels and buttons --------------------------------------------------

    #[test]
    fn jump_to_label_seeks_with_offset() {
        let mut scene = Scene::new();
        let mut timeline = Timeline::new();
        for _ in 0..5 {
            timeline.add_keyframe(Keyframe::new());
        }
        timeline.set_label("mid", 2);
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        scene.jump_to_label(root, "mid", 1);
        assert_eq!(scene.store.clip(root).current_frame(), 3);
        scene.jump_to_label(root, "missing", 0);
        assert_eq!(scene.store.clip(root).current_frame(), 3, "unknown label is a no-op");
    }

    #[test]
    fn button_states_drive_the_playhead() {
        let (mut scene, root) = scene_with_frames(3);
        scene.make_button(root);
        assert!(!scene.store.clip(root).is_playing());

        scene.set_button_state(root, ButtonState::Over);
        assert_eq!(scene.store.clip(root).current_frame(), 1);
        scene.set_button_state(root, ButtonState::Down);
        assert_eq!(scene.store.clip(root).current_frame(), 2);
        scene.set_button_state(root, ButtonState::Up);
        assert_eq!(scene.store.clip(root).current_frame(), 1);
        scene.set_button_state(root, ButtonState::Out);
        assert_eq!(scene.store.clip(root).current_frame(), 0);

        scene.set_button_enabled(root, false);
        scene.set_button_state(root, ButtonState::Down);
        assert_eq!(scene.store.clip(root).current_frame(), 0);
    }

    // -- Sound coordination --------------------------------------------------

    #[test]
    fn audio_ahead_repeats_internal_advances_in_one_tick() {
        let (mut scene, root) = scene_with_frames(6);
        scene.init_sound_stream(
            root,
            StreamInfo {
                handle: SoundHandle(1),
                samples_per_frame: 100.0,
            },
            5,
        );
        for frame in 0..6 {
            scene.add_sound_stream_block(root, frame, StreamBlock { sample_count: 100 });
        }

        let mut audio = MockAudio::default();
        scene.tick(&mut audio).unwrap(); // starts the stream at frame 0
        assert_eq!(audio.stream_started.len(), 1);

        audio.position = Some(300);
        scene.tick(&mut audio).unwrap();
        assert_eq!(
            scene.store.clip(root).current_frame(),
            3,
            "one tick catches the visual clock up to audio"
        );
    }

    #[test]
    fn audio_behind_holds_the_playhead() {
        let (mut scene, root) = scene_with_frames(6);
        scene.init_sound_stream(
            root,
            StreamInfo {
                handle: SoundHandle(1),
                samples_per_frame: 100.0,
            },
            5,
        );
        for frame in 0..6 {
            scene.add_sound_stream_block(root, frame, StreamBlock { sample_count: 100 });
        }

        let mut audio = MockAudio::default();
        scene.tick(&mut audio).unwrap();
        audio.position = Some(0);
        scene.tick(&mut audio).unwrap(); // advances to 1, audio at 0 -> wait
        assert!(scene.store.clip(root).skip_frames_for_stream < 0);
        let held = scene.store.clip(root).current_frame();
        scene.tick(&mut audio).unwrap();
        assert_eq!(
            scene.store.clip(root).current_frame(),
            held,
            "internal advance is gated while audio lags"
        );
    }

    #[test]
    fn sound_volume_cascades_multiplicatively() {
        let mut scene = Scene::new();
        let mut child_timeline = Timeline::new();
        child_timeline.add_keyframe(Keyframe::new());
        let char_child = scene.library.register(Character::new(CharacterDef::MovieClip(
            Rc::new(child_timeline),
        )));
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, char_child));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);
        let child = scene.store.child_at_depth(root, 1).unwrap();

        let mut audio = MockAudio::default();
        scene.start_sound(&mut audio, root, SoundId(1), SoundHandle(10), 0);
        scene.start_sound(&mut audio, child, SoundId(2), SoundHandle(20), 0);
        scene.set_sound_volume(&mut audio, child, 0.5);
        audio.volumes.clear();

        scene.set_sound_volume(&mut audio, root, 0.8);
        assert!(audio.volumes.contains(&(SoundHandle(10), 0.8)));
        assert!(audio.volumes.contains(&(SoundHandle(20), 0.4)));
    }

    #[test]
    fn starting_a_named_sound_replaces_the_previous_one() {
        let (mut scene, root) = scene_with_frames(1);
        let mut audio = MockAudio::default();
        scene.start_sound(&mut audio, root, SoundId(1), SoundHandle(10), 0);
        scene.start_sound(&mut audio, root, SoundId(1), SoundHandle(11), 2);
        assert_eq!(audio.stopped, [SoundHandle(10)]);
        assert_eq!(audio.played, [(SoundHandle(10), 0), (SoundHandle(11), 2)]);
    }

    #[test]
    fn stop_sounds_recurses_into_child_clips() {
        let mut scene = Scene::new();
        let mut child_timeline = Timeline::new();
        child_timeline.add_keyframe(Keyframe::new());
        let char_child = scene.library.register(Character::new(CharacterDef::MovieClip(
            Rc::new(child_timeline),
        )));
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, char_child));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);
        let child = scene.store.child_at_depth(root, 1).unwrap();

        let mut audio = MockAudio::default();
        scene.start_sound(&mut audio, root, SoundId(1), SoundHandle(10), 0);
        scene.start_sound(&mut audio, child, SoundId(2), SoundHandle(20), 0);

        scene.stop_sounds(&mut audio, root, None);
        assert!(audio.stopped.contains(&SoundHandle(10)));
        assert!(audio.stopped.contains(&SoundHandle(20)));
        assert!(scene.mixer.is_empty());
    }

    // -- Lifecycle -----------------------------------------------------------

    #[test]
    fn timeline_handoff_resets_the_clip() {
        let (mut scene, root) = scene_with_frames(3);
        scene.set_current_frame(root, 2);
        assert_eq!(scene.store.clip(root).current_frame(), 2);

        let mut other = Timeline::new();
        other.add_keyframe(Keyframe::new());
        other.add_keyframe(Keyframe::new());
        scene.set_clip_timeline(root, Rc::new(other));
        assert_eq!(scene.store.clip(root).constructed_keyframe, -1);
        assert_eq!(scene.store.clip(root).timeline().num_frames(), 2);
    }

    #[test]
    fn dispose_recycles_the_subtree() {
        let mut scene = Scene::new();
        let shape = shape_char(&mut scene);
        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, shape));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);
        let child = scene.store.child_at_depth(root, 1).unwrap();

        scene.dispose_node(root);
        assert!(!scene.store.is_alive(root));
        assert!(!scene.store.is_alive(child));
    }

    #[test]
    fn reset_text_clones_restores_template_text() {
        use zoetrope_text::font::MetricsTable;
        use zoetrope_text::{TextField, TextFormat};

        let mut scene = Scene::new();
        let font = Rc::new(MetricsTable::monospace(10.0, 10.0, 12.0));
        let mut template = TextField::new(TextFormat::new(font, 10.0, 0));
        template.set_text("score: 0");
        let char_text = scene
            .library
            .register(Character::new(CharacterDef::Text(template)));

        let mut timeline = Timeline::new();
        timeline.add_keyframe(Keyframe::new().place(1, 100, char_text));
        let root = scene.create_movie_clip(Rc::new(timeline));
        scene.set_root(root);
        scene.reset_clip(root, true);

        let field_node = scene.store.child_at_depth(root, 1).unwrap();
        scene.store.text_mut(field_node).set_text("score: 9001");
        assert_eq!(scene.store.text(field_node).text(), "score: 9001");

        scene.reset_text_clones(root);
        assert_eq!(scene.store.text(field_node).text(), "score: 0");
    }

    #[test]
    fn dispatch_key_marks_content() {
        use zoetrope_text::font::MetricsTable;
        use zoetrope_text::format::FieldType;
        use zoetrope_text::{TextField, TextFormat};

        let mut scene = Scene::new();
        let font = Rc::new(MetricsTable::monospace(10.0, 10.0, 12.0));
        let mut template = TextField::new(TextFormat::new(font, 10.0, 0));
        template.set_field_type(FieldType::Input);
        let node = scene
            .store
            .create_node(NodeKind::Text(alloc::boxed::Box::new(template)));
        let _ = scene.store.evaluate();

        assert!(scene.dispatch_key(node, Key::Char('h'), Modifiers::default()));
        assert_eq!(scene.store.text(node).render_text(), "h");
        let changes = scene.store.evaluate();
        assert!(changes.content.contains(&node.index()));
    }
}
