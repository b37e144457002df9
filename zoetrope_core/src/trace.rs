// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Playback diagnostics.
//!
//! [`PlayerSink`] receives typed events from the frame loop. All methods
//! default to no-ops, so implementing only the events you care about is
//! fine. The scene holds at most one sink
//! ([`Scene::set_trace_sink`](crate::clip::Scene::set_trace_sink)); when
//! none is installed, emission is a single branch.
//!
//! Raw slot indices (`u32`) identify nodes in events, matching
//! [`FrameChanges`](crate::node::FrameChanges).

/// Emitted once per [`Scene::tick`](crate::clip::Scene::tick).
#[derive(Clone, Copy, Debug)]
pub struct TickEvent {
    /// Slot index of the root clip, or `u32::MAX` when no root is set.
    pub root: u32,
}

/// Emitted when a clip's playhead is repositioned by a seek.
#[derive(Clone, Copy, Debug)]
pub struct SeekEvent {
    /// Slot index of the clip.
    pub clip: u32,
    /// The frame index the caller asked for.
    pub requested: i32,
    /// The frame index after clamping.
    pub resolved: i32,
    /// Whether the seek queues the target keyframe's script. Seeks past
    /// the end land on the last frame without firing scripts.
    pub fires_scripts: bool,
}

/// Emitted after a keyframe's children have been materialized.
#[derive(Clone, Copy, Debug)]
pub struct FrameConstructedEvent {
    /// Slot index of the clip.
    pub clip: u32,
    /// The keyframe that was materialized.
    pub frame: u32,
    /// Children constructed by the diff.
    pub placed: u32,
    /// Children torn down by the diff.
    pub removed: u32,
}

/// Emitted when a frame script fails (before the error propagates).
#[derive(Clone, Copy, Debug)]
pub struct ScriptErrorEvent {
    /// Slot index of the clip whose script failed.
    pub clip: u32,
}

/// Emitted when the stream synchronizer asks the timeline to skip.
#[derive(Clone, Copy, Debug)]
pub struct SoundSkipEvent {
    /// Slot index of the clip.
    pub clip: u32,
    /// Signed skip count: positive means the visual timeline repeats
    /// internal advances to catch up with audio.
    pub skip: i32,
}

/// Receives playback events from the frame loop.
///
/// All methods have default no-op implementations.
pub trait PlayerSink {
    /// Called at the start of each tick.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called when a clip's playhead is repositioned.
    fn on_seek(&mut self, e: &SeekEvent) {
        _ = e;
    }

    /// Called after a keyframe's children have been materialized.
    fn on_frame_constructed(&mut self, e: &FrameConstructedEvent) {
        _ = e;
    }

    /// Called when a frame script fails.
    fn on_script_error(&mut self, e: &ScriptErrorEvent) {
        _ = e;
    }

    /// Called when the stream synchronizer reports a non-zero skip count.
    fn on_sound_skip(&mut self, e: &SoundSkipEvent) {
        _ = e;
    }
}

/// A [`PlayerSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl PlayerSink for NoopSink {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_accepts_every_event() {
        let mut sink = NoopSink;
        sink.on_tick(&TickEvent { root: 0 });
        sink.on_seek(&SeekEvent {
            clip: 0,
            requested: 9,
            resolved: 3,
            fires_scripts: false,
        });
        sink.on_frame_constructed(&FrameConstructedEvent {
            clip: 0,
            frame: 1,
            placed: 2,
            removed: 1,
        });
        sink.on_script_error(&ScriptErrorEvent { clip: 0 });
        sink.on_sound_skip(&SoundSkipEvent { clip: 0, skip: 2 });
    }
}
