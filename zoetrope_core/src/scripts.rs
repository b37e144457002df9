// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The deferred frame-script scheduler.
//!
//! Scripts never run inline during child construction — the frame tick is
//! not reentrant, so everything is queued and flushed once per tick. Two
//! ordered queues cooperate:
//!
//! - the **primary queue** holds scripts queued during normal frame
//!   construction;
//! - the **pass2 queue** holds scripts discovered while scripts are
//!   already pending or executing (a newly constructed child's frame-0
//!   script must not jump ahead of siblings queued before it).
//!
//! Before a script is appended to the primary queue, and whenever the
//! primary queue runs dry during a flush, the pass2 queue is drained into
//! it. Net effect: pass2 entries execute in their original relative order,
//! after every entry queued before the drain — within the same tick.
//!
//! The scheduler is owned by the [`Scene`]; there is deliberately one
//! ordering point per scene, not per clip, so cross-clip script order
//! follows display-tree construction order.
//!
//! # Error policy
//!
//! A script error is logged with the owning clip's name, both queues are
//! cleared, and the error propagates — the remainder of the flush is
//! abandoned (fail-fast). Clearing on the error path keeps stale entries
//! from corrupting the next tick.

use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::clip::Scene;
use crate::node::NodeId;
use crate::trace::ScriptErrorEvent;

/// Error produced by a failing frame script.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("frame script error in `{clip_name}`: {message}")]
pub struct ScriptError {
    /// Instance name of the clip the script was bound to.
    pub clip_name: String,
    /// The script's own failure message.
    pub message: String,
}

impl ScriptError {
    /// Creates a script error.
    #[must_use]
    pub fn new(clip_name: &str, message: &str) -> Self {
        Self {
            clip_name: clip_name.to_string(),
            message: message.to_string(),
        }
    }
}

/// A frame script: invoked with the scene and the clip it is bound to.
pub type FrameScript = Rc<dyn Fn(&mut Scene, NodeId) -> Result<(), ScriptError>>;

#[derive(Clone)]
struct QueuedScript {
    clip: NodeId,
    script: FrameScript,
}

/// The two-queue deferred script scheduler.
///
/// One instance per [`Scene`], injected rather than global, so tests can
/// use isolated schedulers.
#[derive(Default)]
pub struct FrameScriptScheduler {
    queue: Vec<QueuedScript>,
    pass2: Vec<QueuedScript>,
    executing: bool,
}

impl fmt::Debug for FrameScriptScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScriptScheduler")
            .field("queued", &self.queue.len())
            .field("pass2", &self.pass2.len())
            .field("executing", &self.executing)
            .finish()
    }
}

impl FrameScriptScheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a script for the current tick's flush.
    ///
    /// Pending pass2 entries are drained into the primary queue first, so
    /// they keep their position ahead of this script.
    pub fn queue_script(&mut self, clip: NodeId, script: FrameScript) {
        self.drain_pass2_into_queue();
        self.queue.push(QueuedScript { clip, script });
    }

    /// Queues a script behind every script already considered in the
    /// current pass. Used for scripts discovered mid-pass (frame-0 scripts
    /// of children constructed while scripts are pending or executing).
    pub fn queue_script_pass2(&mut self, clip: NodeId, script: FrameScript) {
        self.pass2.push(QueuedScript { clip, script });
    }

    /// Total scripts waiting in both queues.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queue.len() + self.pass2.len()
    }

    /// Whether a flush is currently executing.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.executing
    }

    /// Drops every queued script.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.pass2.clear();
    }

    fn drain_pass2_into_queue(&mut self) {
        let drained = core::mem::take(&mut self.pass2);
        self.queue.extend(drained);
    }
}

impl Scene {
    /// Flushes the script queues: executes every queued script in order,
    /// including scripts enqueued during the flush itself.
    ///
    /// Scripts bound to a detached, non-root clip are silently skipped.
    /// Reentrant calls (a script triggering another flush) are no-ops.
    ///
    /// # Errors
    ///
    /// Propagates the first script failure. Both queues are cleared before
    /// returning, on success and on error alike.
    pub fn run_frame_scripts(&mut self) -> Result<(), ScriptError> {
        if self.scripts.executing {
            return Ok(());
        }
        self.scripts.executing = true;

        let mut i = 0;
        let mut result = Ok(());
        loop {
            if i >= self.scripts.queue.len() {
                if self.scripts.pass2.is_empty() {
                    break;
                }
                self.scripts.drain_pass2_into_queue();
                continue;
            }
            let entry = self.scripts.queue[i].clone();
            i += 1;

            if !self.store.is_alive(entry.clip) {
                continue;
            }
            let attached =
                self.store.parent(entry.clip).is_some() || self.root() == Some(entry.clip);
            if !attached {
                continue;
            }

            if let Err(err) = (entry.script)(self, entry.clip) {
                let name = self
                    .store
                    .name(entry.clip)
                    .unwrap_or("<unnamed>")
                    .to_string();
                log::error!("frame script error in `{name}`: {}", err.message);
                self.emit_script_error(ScriptErrorEvent {
                    clip: entry.clip.index(),
                });
                result = Err(err);
                break;
            }
        }

        // Queue state after an abort would be indeterminate; clear both
        // paths unconditionally.
        self.scripts.queue.clear();
        self.scripts.pass2.clear();
        self.scripts.executing = false;
        result
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::clip::Scene;

    fn recording_script(log: &Rc<RefCell<Vec<u32>>>, tag: u32) -> FrameScript {
        let log = log.clone();
        Rc::new(move |_scene, _clip| {
            log.borrow_mut().push(tag);
            Ok(())
        })
    }

    fn scene_with_root() -> (Scene, crate::node::NodeId) {
        let mut scene = Scene::new();
        let root = scene.create_movie_clip(Rc::new(crate::timeline::Timeline::new()));
        scene.set_root(root);
        (scene, root)
    }

    #[test]
    fn primary_queue_runs_in_order() {
        let (mut scene, root) = scene_with_root();
        let log = Rc::new(RefCell::new(Vec::new()));
        scene.scripts.queue_script(root, recording_script(&log, 1));
        scene.scripts.queue_script(root, recording_script(&log, 2));
        scene.run_frame_scripts().unwrap();
        assert_eq!(*log.borrow(), [1, 2]);
        assert_eq!(scene.scripts.pending(), 0);
    }

    #[test]
    fn pass2_runs_after_earlier_entries_in_original_order() {
        let (mut scene, root) = scene_with_root();
        let log = Rc::new(RefCell::new(Vec::new()));
        scene.scripts.queue_script(root, recording_script(&log, 1));
        scene.scripts.queue_script_pass2(root, recording_script(&log, 2));
        scene.scripts.queue_script_pass2(root, recording_script(&log, 3));
        // Queueing to the primary queue drains pass2 ahead of the new entry.
        scene.scripts.queue_script(root, recording_script(&log, 4));
        scene.run_frame_scripts().unwrap();
        assert_eq!(*log.borrow(), [1, 2, 3, 4]);
    }

    #[test]
    fn scripts_enqueued_during_flush_run_in_the_same_flush() {
        let (mut scene, root) = scene_with_root();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner = recording_script(&log, 2);
        let log2 = log.clone();
        scene.scripts.queue_script(
            root,
            Rc::new(move |scene: &mut Scene, clip| {
                log2.borrow_mut().push(1);
                scene.scripts.queue_script_pass2(clip, inner.clone());
                Ok(())
            }),
        );
        scene.run_frame_scripts().unwrap();
        assert_eq!(*log.borrow(), [1, 2]);
    }

    #[test]
    fn detached_clip_scripts_are_skipped() {
        let (mut scene, root) = scene_with_root();
        let detached = scene.create_movie_clip(Rc::new(crate::timeline::Timeline::new()));
        let log = Rc::new(RefCell::new(Vec::new()));
        scene.scripts.queue_script(detached, recording_script(&log, 1));
        scene.scripts.queue_script(root, recording_script(&log, 2));
        scene.run_frame_scripts().unwrap();
        // The root is exempt from the attachment check; the detached clip
        // is not.
        assert_eq!(*log.borrow(), [2]);
    }

    #[test]
    fn error_aborts_flush_and_clears_both_queues() {
        let (mut scene, root) = scene_with_root();
        let log = Rc::new(RefCell::new(Vec::new()));
        scene.store.set_name(root, Some("main".into()));

        scene.scripts.queue_script(
            root,
            Rc::new(|_, _| Err(ScriptError::new("main", "boom"))),
        );
        scene.scripts.queue_script(root, recording_script(&log, 9));
        scene.scripts.queue_script_pass2(root, recording_script(&log, 10));

        let err = scene.run_frame_scripts().unwrap_err();
        assert_eq!(err.message, "boom");
        assert!(log.borrow().is_empty(), "later scripts must not run");
        assert_eq!(scene.scripts.pending(), 0, "queues cleared on abort");

        // The next flush starts clean.
        scene.scripts.queue_script(root, recording_script(&log, 11));
        scene.run_frame_scripts().unwrap();
        assert_eq!(*log.borrow(), [11]);
    }

    #[test]
    fn reentrant_flush_is_a_no_op() {
        let (mut scene, root) = scene_with_root();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log2 = log.clone();
        scene.scripts.queue_script(
            root,
            Rc::new(move |scene: &mut Scene, _| {
                // A script must not trigger another full flush.
                scene.run_frame_scripts()?;
                log2.borrow_mut().push(1);
                Ok(())
            }),
        );
        scene.scripts.queue_script(root, recording_script(&log, 2));
        scene.run_frame_scripts().unwrap();
        assert_eq!(*log.borrow(), [1, 2]);
    }

    #[test]
    fn script_error_display_includes_clip_name() {
        let err = ScriptError::new("door_btn", "undefined is not a function");
        let rendered = alloc::format!("{err}");
        assert!(rendered.contains("door_btn"));
        assert!(rendered.contains("undefined is not a function"));
    }
}
