// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Audio control seam and stream synchronization.
//!
//! The engine never decodes or mixes audio. It drives an opaque
//! [`AudioBackend`] with play/stop/volume calls and, for streaming
//! timeline sound, asks the backend where playback currently is so the
//! visual frame clock can be reconciled against it.
//!
//! [`SoundStreamSync`] owns that reconciliation: `sync_sounds` returns a
//! signed skip count — zero when in sync, positive when audio has run
//! ahead and the timeline must repeat internal advances to catch up,
//! negative when audio lags and the timeline should hold its frame.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;

use crate::clip::Scene;
use crate::node::{NodeId, NodeKind};
use crate::trace::SoundSkipEvent;

/// An opaque handle to a decoded sound owned by the audio engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundHandle(pub u32);

/// A logical name for a one-shot timeline sound. Starting a sound under a
/// name that is already playing stops and replaces it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundId(pub u32);

/// Platform audio capability trait.
///
/// Implementations map these calls onto a real mixer; the engine holds no
/// audio state beyond handles.
pub trait AudioBackend {
    /// Starts a one-shot sound. `loops` of zero plays once.
    fn play(&mut self, handle: SoundHandle, loops: u32);

    /// Stops a one-shot sound.
    fn stop(&mut self, handle: SoundHandle);

    /// Sets a sound's volume (0.0–1.0).
    fn set_volume(&mut self, handle: SoundHandle, volume: f64);

    /// Starts streaming playback at the given sample offset.
    fn play_stream(&mut self, handle: SoundHandle, start_sample: u64);

    /// Stops streaming playback.
    fn stop_stream(&mut self, handle: SoundHandle);

    /// Current stream playback position in samples, if the stream is
    /// running and the platform can report it.
    fn stream_position_samples(&mut self, handle: SoundHandle) -> Option<u64>;
}

/// An [`AudioBackend`] that swallows every call. Useful for headless
/// playback and tests that do not exercise sound.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAudio;

impl AudioBackend for NullAudio {
    fn play(&mut self, _handle: SoundHandle, _loops: u32) {}
    fn stop(&mut self, _handle: SoundHandle) {}
    fn set_volume(&mut self, _handle: SoundHandle, _volume: f64) {}
    fn play_stream(&mut self, _handle: SoundHandle, _start_sample: u64) {}
    fn stop_stream(&mut self, _handle: SoundHandle) {}
    fn stream_position_samples(&mut self, _handle: SoundHandle) -> Option<u64> {
        None
    }
}

/// Static description of a clip's stream sound track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamInfo {
    /// The decoded stream this clip plays.
    pub handle: SoundHandle,
    /// Audio samples per timeline frame.
    pub samples_per_frame: f64,
}

/// One frame's worth of stream data, registered per keyframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamBlock {
    /// Samples carried by this frame's block.
    pub sample_count: u32,
}

/// Reconciles the visual frame clock against a streaming sound track.
#[derive(Clone, Debug)]
pub struct SoundStreamSync {
    info: StreamInfo,
    max_frame: u32,
    blocks: BTreeMap<u32, StreamBlock>,
    started: bool,
    stopped: bool,
}

impl SoundStreamSync {
    /// Creates a synchronizer for the given stream, valid through
    /// `max_frame`.
    #[must_use]
    pub fn new(info: StreamInfo, max_frame: u32) -> Self {
        Self {
            info,
            max_frame,
            blocks: BTreeMap::new(),
            started: false,
            stopped: false,
        }
    }

    /// Registers a stream block for `frame`.
    pub fn add_block(&mut self, frame: u32, block: StreamBlock) {
        self.blocks.insert(frame, block);
    }

    /// Stops the stream (a timeline stop cue or an explicit stop). The
    /// stream stays stopped until [`reset_stopped`](Self::reset_stopped).
    pub fn stop(&mut self, audio: &mut dyn AudioBackend) {
        if self.started {
            audio.stop_stream(self.info.handle);
            self.started = false;
        }
        self.stopped = true;
    }

    /// Clears the stopped latch so the stream may start again.
    pub fn reset_stopped(&mut self) {
        self.stopped = false;
    }

    /// First frame covered by stream blocks, if any were registered.
    #[must_use]
    pub fn start_frame(&self) -> Option<u32> {
        self.blocks.keys().next().copied()
    }

    /// Reconciles the stream against the visual frame clock.
    ///
    /// Starts playback when the playhead enters the covered range, stops
    /// it when the playhead leaves or the clip stops, and otherwise
    /// returns the signed frame distance between the audio position and
    /// `frame`.
    pub fn sync(&mut self, frame: u32, is_playing: bool, audio: &mut dyn AudioBackend) -> i32 {
        if !is_playing || self.stopped {
            if self.started {
                audio.stop_stream(self.info.handle);
                self.started = false;
            }
            return 0;
        }

        let Some(start) = self.start_frame() else {
            return 0;
        };
        let Some(&end) = self.blocks.keys().next_back() else {
            return 0;
        };
        let covered = frame >= start && frame <= end && frame <= self.max_frame;
        if !covered {
            if self.started {
                audio.stop_stream(self.info.handle);
                self.started = false;
            }
            return 0;
        }

        if !self.started {
            let offset = f64::from(frame - start) * self.info.samples_per_frame;
            audio.play_stream(self.info.handle, offset as u64);
            self.started = true;
            return 0;
        }

        let Some(position) = audio.stream_position_samples(self.info.handle) else {
            return 0;
        };
        let audio_frame = start + (position as f64 / self.info.samples_per_frame) as u32;
        let audio_frame = audio_frame.min(end);
        audio_frame as i32 - frame as i32
    }
}

/// Scene-wide registry of live one-shot sounds by name, for mass stops.
///
/// Owned by the [`Scene`]; replaces any notion of a process-global sound
/// table.
#[derive(Debug, Default)]
pub struct SoundMixer {
    active: BTreeMap<SoundId, Vec<SoundHandle>>,
}

impl SoundMixer {
    /// Creates an empty mixer registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a started sound under its name.
    pub fn register(&mut self, id: SoundId, handle: SoundHandle) {
        self.active.entry(id).or_default().push(handle);
    }

    /// Removes and returns every live handle registered under `id`.
    pub fn take(&mut self, id: SoundId) -> Vec<SoundHandle> {
        self.active.remove(&id).unwrap_or_default()
    }

    /// Drops all registrations (the sounds themselves are stopped by the
    /// caller).
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Number of names with live sounds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no sounds are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sound#{}", self.0)
    }
}

impl Scene {
    /// Installs a stream sound on a clip.
    pub fn init_sound_stream(&mut self, id: NodeId, info: StreamInfo, max_frame: u32) {
        self.store.clip_mut(id).stream = Some(SoundStreamSync::new(info, max_frame));
    }

    /// Registers one frame's stream block on a clip's stream.
    ///
    /// # Panics
    ///
    /// Panics if no stream was installed via
    /// [`init_sound_stream`](Self::init_sound_stream).
    pub fn add_sound_stream_block(&mut self, id: NodeId, frame: u32, block: StreamBlock) {
        let clip = self.store.clip_mut(id);
        clip.stream
            .as_mut()
            .expect("add_sound_stream_block: clip has no sound stream")
            .add_block(frame, block);
    }

    /// Stops a clip's stream sound until the next reset.
    pub fn stop_current_stream(&mut self, audio: &mut dyn AudioBackend, id: NodeId) {
        if let Some(stream) = &mut self.store.clip_mut(id).stream {
            stream.stop(audio);
        }
    }

    /// Clears a clip's stream stopped latch.
    pub fn reset_stream_stopped(&mut self, id: NodeId) {
        if let Some(stream) = &mut self.store.clip_mut(id).stream {
            stream.reset_stopped();
        }
    }

    /// Queries the clip's stream synchronizer. Returns the signed skip
    /// count (zero when the clip has no stream).
    pub fn sync_sounds(&mut self, audio: &mut dyn AudioBackend, id: NodeId, frame: u32) -> i32 {
        let clip = self.store.clip_mut(id);
        let is_playing = clip.is_playing;
        let skip = match &mut clip.stream {
            Some(stream) => stream.sync(frame, is_playing, audio),
            None => 0,
        };
        if skip != 0 {
            self.emit_sound_skip(SoundSkipEvent {
                clip: id.index(),
                skip,
            });
        }
        skip
    }

    /// Starts a one-shot sound on a clip. A sound already playing under
    /// the same name is stopped and replaced.
    pub fn start_sound(
        &mut self,
        audio: &mut dyn AudioBackend,
        id: NodeId,
        sound: SoundId,
        handle: SoundHandle,
        loops: u32,
    ) {
        if let Some(existing) = self.store.clip(id).sounds.get(&sound) {
            audio.stop(*existing);
        }
        audio.play(handle, loops);
        self.store.clip_mut(id).sounds.insert(sound, handle);
        self.mixer.register(sound, handle);
    }

    /// Stops a named sound on this clip and every live sound registered
    /// under the same name anywhere in the scene.
    pub fn stop_sound(&mut self, audio: &mut dyn AudioBackend, id: NodeId, sound: SoundId) {
        if let Some(handle) = self.store.clip_mut(id).sounds.remove(&sound) {
            audio.stop(handle);
        }
        for handle in self.mixer.take(sound) {
            audio.stop(handle);
        }
    }

    /// Stops sounds on this clip and, recursively, on every child movie
    /// clip. With `sound` set, only that name is stopped; otherwise all.
    /// Also stops the clip's stream and clears the scene sound registry.
    pub fn stop_sounds(
        &mut self,
        audio: &mut dyn AudioBackend,
        id: NodeId,
        sound: Option<SoundId>,
    ) {
        match sound {
            Some(sid) => {
                if let Some(handle) = self.store.clip_mut(id).sounds.remove(&sid) {
                    audio.stop(handle);
                }
            }
            None => {
                let sounds = core::mem::take(&mut self.store.clip_mut(id).sounds);
                for handle in sounds.values() {
                    audio.stop(*handle);
                }
            }
        }

        let children: Vec<NodeId> = self.store.children(id).collect();
        for child in children {
            if matches!(self.store.kind(child), NodeKind::MovieClip(_)) {
                self.stop_sounds(audio, child, sound);
            }
        }

        self.stop_current_stream(audio, id);
        self.mixer.clear();
    }

    /// Sets a clip's sound volume and cascades it multiplicatively to all
    /// named sounds and child clips.
    pub fn set_sound_volume(&mut self, audio: &mut dyn AudioBackend, id: NodeId, volume: f64) {
        if self.store.clip(id).sound_volume == volume {
            return;
        }
        self.store.clip_mut(id).sound_volume = volume;
        self.apply_sound_volume(audio, id, volume);
    }

    fn apply_sound_volume(&mut self, audio: &mut dyn AudioBackend, id: NodeId, effective: f64) {
        for handle in self.store.clip(id).sounds.values() {
            audio.set_volume(*handle, effective);
        }
        let children: Vec<NodeId> = self.store.children(id).collect();
        for child in children {
            if matches!(self.store.kind(child), NodeKind::MovieClip(_)) {
                let child_own = self.store.clip(child).sound_volume;
                self.apply_sound_volume(audio, child, effective * child_own);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockAudio;
    use super::*;

    fn stream() -> SoundStreamSync {
        let mut s = SoundStreamSync::new(
            StreamInfo {
                handle: SoundHandle(7),
                samples_per_frame: 100.0,
            },
            10,
        );
        for frame in 0..=10 {
            s.add_block(frame, StreamBlock { sample_count: 100 });
        }
        s
    }

    #[test]
    fn stream_starts_when_playhead_enters_coverage() {
        let mut audio = MockAudio::default();
        let mut s = stream();
        let skip = s.sync(0, true, &mut audio);
        assert_eq!(skip, 0);
        assert_eq!(audio.stream_started, [(SoundHandle(7), 0)]);
    }

    #[test]
    fn stream_start_mid_track_seeks_by_samples() {
        let mut audio = MockAudio::default();
        let mut s = stream();
        let _ = s.sync(4, true, &mut audio);
        assert_eq!(audio.stream_started, [(SoundHandle(7), 400)]);
    }

    #[test]
    fn in_sync_returns_zero() {
        let mut audio = MockAudio::default();
        let mut s = stream();
        let _ = s.sync(3, true, &mut audio);
        audio.position = Some(300);
        assert_eq!(s.sync(3, true, &mut audio), 0);
    }

    #[test]
    fn audio_ahead_returns_positive_skip() {
        let mut audio = MockAudio::default();
        let mut s = stream();
        let _ = s.sync(0, true, &mut audio);
        // Audio has played 5 frames' worth; the visual clock is at 2.
        audio.position = Some(500);
        assert_eq!(s.sync(2, true, &mut audio), 3);
    }

    #[test]
    fn audio_behind_returns_negative_skip() {
        let mut audio = MockAudio::default();
        let mut s = stream();
        let _ = s.sync(0, true, &mut audio);
        audio.position = Some(100);
        assert_eq!(s.sync(4, true, &mut audio), -3);
    }

    #[test]
    fn stopping_clip_stops_stream() {
        let mut audio = MockAudio::default();
        let mut s = stream();
        let _ = s.sync(0, true, &mut audio);
        let skip = s.sync(0, false, &mut audio);
        assert_eq!(skip, 0);
        assert_eq!(audio.stream_stopped, [SoundHandle(7)]);
    }

    #[test]
    fn stopped_latch_holds_until_reset() {
        let mut audio = MockAudio::default();
        let mut s = stream();
        s.stop(&mut audio);
        assert_eq!(s.sync(0, true, &mut audio), 0);
        assert!(audio.stream_started.is_empty());

        s.reset_stopped();
        let _ = s.sync(0, true, &mut audio);
        assert_eq!(audio.stream_started.len(), 1);
    }

    #[test]
    fn leaving_covered_range_stops_stream() {
        let mut audio = MockAudio::default();
        let mut s = SoundStreamSync::new(
            StreamInfo {
                handle: SoundHandle(1),
                samples_per_frame: 10.0,
            },
            100,
        );
        s.add_block(2, StreamBlock { sample_count: 10 });
        s.add_block(3, StreamBlock { sample_count: 10 });

        assert_eq!(s.sync(0, true, &mut audio), 0);
        assert!(audio.stream_started.is_empty(), "before coverage: silent");

        let _ = s.sync(2, true, &mut audio);
        assert_eq!(audio.stream_started.len(), 1);

        let _ = s.sync(7, true, &mut audio);
        assert_eq!(audio.stream_stopped.len(), 1, "past coverage: stopped");
    }

    #[test]
    fn mixer_registry_takes_all_handles_for_a_name() {
        let mut mixer = SoundMixer::new();
        mixer.register(SoundId(1), SoundHandle(10));
        mixer.register(SoundId(1), SoundHandle(11));
        mixer.register(SoundId(2), SoundHandle(20));
        assert_eq!(mixer.take(SoundId(1)), [SoundHandle(10), SoundHandle(11)]);
        assert!(mixer.take(SoundId(1)).is_empty());
        assert_eq!(mixer.len(), 1);
    }
}
