// Copyright 2026 the Zoetrope Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reusable audio/visual drift metrics and grading for demo harnesses.
//!
//! Feed one [`DriftSample`] per tick (the stream synchronizer's skip count
//! is the interesting part) and read back a running [`DriftReport`]: how
//! often the visual clock had to skip or hold, how far it drifted at
//! worst, and a letter grade for the HUD.

#![no_std]

extern crate alloc;

use alloc::string::String;

use zoetrope_core::trace::SoundSkipEvent;

/// Per-tick metrics sample fed into [`DriftTracker::observe`].
#[derive(Clone, Copy, Debug)]
pub struct DriftSample {
    /// Signed skip count the stream synchronizer reported this tick:
    /// positive means frames were skipped to catch audio, negative means
    /// the playhead held for audio.
    pub skip_frames: i32,
    /// Frames actually advanced this tick (including catch-up repeats).
    pub frames_advanced: u32,
}

impl DriftSample {
    /// Builds a sample from a player [`SoundSkipEvent`].
    #[must_use]
    pub fn from_skip_event(event: &SoundSkipEvent, frames_advanced: u32) -> Self {
        Self {
            skip_frames: event.skip,
            frames_advanced,
        }
    }
}

/// Letter grade for playback smoothness.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriftGrade {
    /// Sample-accurate: essentially no skips.
    A,
    /// Occasional single-frame corrections.
    B,
    /// Frequent corrections; visibly rough.
    C,
    /// Audio and video fight each other.
    D,
}

impl DriftGrade {
    /// Returns a short label for HUD rendering.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
        }
    }
}

/// Aggregated report returned by [`DriftTracker::observe`].
#[derive(Clone, Copy, Debug)]
pub struct DriftReport {
    /// Current grade.
    pub grade: DriftGrade,
    /// Ticks with a non-zero skip per 1000 observed ticks.
    pub skip_rate_per_1000: f64,
    /// This tick's signed skip count.
    pub skip_frames: i32,
    /// Largest absolute skip seen so far.
    pub max_abs_skip: u32,
    /// Total ticks observed.
    pub total_ticks: u64,
    /// Total ticks with a non-zero skip.
    pub skipped_ticks: u64,
}

/// Rolling drift tracker with a fixed-size skip history.
#[derive(Debug)]
pub struct DriftTracker<const N: usize> {
    skips: [i32; N],
    cursor: usize,
    total_ticks: u64,
    skipped_ticks: u64,
    max_abs_skip: u32,
}

impl<const N: usize> Default for DriftTracker<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DriftTracker<N> {
    /// Creates an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            skips: [0; N],
            cursor: 0,
            total_ticks: 0,
            skipped_ticks: 0,
            max_abs_skip: 0,
        }
    }

    /// Observes one tick and returns an updated report.
    #[must_use]
    pub fn observe(&mut self, sample: DriftSample) -> DriftReport {
        self.total_ticks = self.total_ticks.saturating_add(1);
        self.skips[self.cursor % N] = sample.skip_frames;
        self.cursor = (self.cursor + 1) % N;

        if sample.skip_frames != 0 {
            self.skipped_ticks = self.skipped_ticks.saturating_add(1);
        }
        let abs = sample.skip_frames.unsigned_abs();
        if abs > self.max_abs_skip {
            self.max_abs_skip = abs;
        }

        let skip_rate = if self.total_ticks == 0 {
            0.0
        } else {
            self.skipped_ticks as f64 * 1000.0 / self.total_ticks as f64
        };

        DriftReport {
            grade: grade_for(skip_rate, self.max_abs_skip),
            skip_rate_per_1000: skip_rate,
            skip_frames: sample.skip_frames,
            max_abs_skip: self.max_abs_skip,
            total_ticks: self.total_ticks,
            skipped_ticks: self.skipped_ticks,
        }
    }

    /// Returns ring-buffer skip counts oldest→newest.
    #[must_use]
    pub fn skip_history(&self) -> [i32; N] {
        let mut out = [0; N];
        let mut i = 0;
        while i < N {
            out[i] = self.skips[(self.cursor + i) % N];
            i += 1;
        }
        out
    }

    /// Returns an ASCII sparkline over `skip_history()`.
    #[must_use]
    pub fn sparkline(&self) -> String {
        const GLYPHS: [char; 5] = [' ', '.', ':', '|', '#'];
        let mut out = String::with_capacity(N);
        for &skip in &self.skip_history() {
            let level = (skip.unsigned_abs() as usize).min(GLYPHS.len() - 1);
            out.push(GLYPHS[level]);
        }
        out
    }
}

fn grade_for(skip_rate_per_1000: f64, max_abs_skip: u32) -> DriftGrade {
    if skip_rate_per_1000 <= 1.0 && max_abs_skip <= 1 {
        DriftGrade::A
    } else if skip_rate_per_1000 <= 50.0 && max_abs_skip <= 2 {
        DriftGrade::B
    } else if skip_rate_per_1000 <= 250.0 {
        DriftGrade::C
    } else {
        DriftGrade::D
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(skip: i32) -> DriftSample {
        DriftSample {
            skip_frames: skip,
            frames_advanced: if skip > 0 { 1 + skip as u32 } else { 1 },
        }
    }

    #[test]
    fn clean_playback_grades_a() {
        let mut tracker: DriftTracker<16> = DriftTracker::new();
        let mut report = tracker.observe(sample(0));
        for _ in 0..100 {
            report = tracker.observe(sample(0));
        }
        assert_eq!(report.grade, DriftGrade::A);
        assert_eq!(report.skip_rate_per_1000, 0.0);
    }

    #[test]
    fn constant_heavy_skipping_grades_d() {
        let mut tracker: DriftTracker<16> = DriftTracker::new();
        let mut report = tracker.observe(sample(4));
        for _ in 0..100 {
            report = tracker.observe(sample(4));
        }
        assert_eq!(report.grade, DriftGrade::D);
        assert_eq!(report.max_abs_skip, 4);
    }

    #[test]
    fn negative_skips_count_as_drift() {
        let mut tracker: DriftTracker<8> = DriftTracker::new();
        let report = tracker.observe(sample(-2));
        assert_eq!(report.skipped_ticks, 1);
        assert_eq!(report.max_abs_skip, 2);
    }

    #[test]
    fn history_is_oldest_to_newest() {
        let mut tracker: DriftTracker<4> = DriftTracker::new();
        for skip in 1..=6 {
            let _ = tracker.observe(sample(skip));
        }
        assert_eq!(tracker.skip_history(), [3, 4, 5, 6]);
    }

    #[test]
    fn sample_from_skip_event_carries_the_count() {
        let event = zoetrope_core::trace::SoundSkipEvent { clip: 3, skip: 2 };
        let sample = DriftSample::from_skip_event(&event, 3);
        assert_eq!(sample.skip_frames, 2);
        assert_eq!(sample.frames_advanced, 3);
    }

    #[test]
    fn sparkline_has_fixed_width() {
        let mut tracker: DriftTracker<8> = DriftTracker::new();
        for skip in [0, 1, 2, 9] {
            let _ = tracker.observe(sample(skip));
        }
        let line = tracker.sparkline();
        assert_eq!(line.chars().count(), 8);
        assert!(line.contains('#'), "large skips saturate the scale");
    }
}
