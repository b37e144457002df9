// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Playback event recording and JSON export.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};
use zoetrope_core::trace::{
    FrameConstructedEvent, PlayerSink, ScriptErrorEvent, SeekEvent, SoundSkipEvent, TickEvent,
};

/// One recorded playback event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedEvent {
    /// A scene tick began.
    Tick {
        /// Root clip slot.
        root: u32,
    },
    /// A playhead seek.
    Seek {
        /// Clip slot.
        clip: u32,
        /// Requested frame.
        requested: i32,
        /// Clamped frame.
        resolved: i32,
        /// Whether the seek queued scripts.
        fires_scripts: bool,
    },
    /// A keyframe was materialized.
    FrameConstructed {
        /// Clip slot.
        clip: u32,
        /// Keyframe index.
        frame: u32,
        /// Children constructed.
        placed: u32,
        /// Children torn down.
        removed: u32,
    },
    /// A frame script failed.
    ScriptError {
        /// Clip slot.
        clip: u32,
    },
    /// The stream synchronizer reported a skip.
    SoundSkip {
        /// Clip slot.
        clip: u32,
        /// Signed skip count.
        skip: i32,
    },
}

/// A [`PlayerSink`] that collects events into shared storage.
///
/// Clones share the same storage, so a clone can be handed to
/// [`Scene::set_trace_sink`](zoetrope_core::clip::Scene::set_trace_sink)
/// while the original stays readable from the test or tool.
#[derive(Clone, Debug, Default)]
pub struct RecorderSink {
    events: Rc<RefCell<Vec<RecordedEvent>>>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.borrow().clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Drops all recorded events.
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Renders the recording as a JSON array, one object per event.
    #[must_use]
    pub fn to_json(&self) -> String {
        let values: Vec<Value> = self.events.borrow().iter().map(event_json).collect();
        Value::Array(values).to_string()
    }
}

fn event_json(event: &RecordedEvent) -> Value {
    match *event {
        RecordedEvent::Tick { root } => json!({"event": "tick", "root": root}),
        RecordedEvent::Seek {
            clip,
            requested,
            resolved,
            fires_scripts,
        } => json!({
            "event": "seek",
            "clip": clip,
            "requested": requested,
            "resolved": resolved,
            "fires_scripts": fires_scripts,
        }),
        RecordedEvent::FrameConstructed {
            clip,
            frame,
            placed,
            removed,
        } => json!({
            "event": "frame_constructed",
            "clip": clip,
            "frame": frame,
            "placed": placed,
            "removed": removed,
        }),
        RecordedEvent::ScriptError { clip } => json!({"event": "script_error", "clip": clip}),
        RecordedEvent::SoundSkip { clip, skip } => {
            json!({"event": "sound_skip", "clip": clip, "skip": skip})
        }
    }
}

impl PlayerSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.events
            .borrow_mut()
            .push(RecordedEvent::Tick { root: e.root });
    }

    fn on_seek(&mut self, e: &SeekEvent) {
        self.events.borrow_mut().push(RecordedEvent::Seek {
            clip: e.clip,
            requested: e.requested,
            resolved: e.resolved,
            fires_scripts: e.fires_scripts,
        });
    }

    fn on_frame_constructed(&mut self, e: &FrameConstructedEvent) {
        self.events
            .borrow_mut()
            .push(RecordedEvent::FrameConstructed {
                clip: e.clip,
                frame: e.frame,
                placed: e.placed,
                removed: e.removed,
            });
    }

    fn on_script_error(&mut self, e: &ScriptErrorEvent) {
        self.events
            .borrow_mut()
            .push(RecordedEvent::ScriptError { clip: e.clip });
    }

    fn on_sound_skip(&mut self, e: &SoundSkipEvent) {
        self.events.borrow_mut().push(RecordedEvent::SoundSkip {
            clip: e.clip,
            skip: e.skip,
        });
    }
}
