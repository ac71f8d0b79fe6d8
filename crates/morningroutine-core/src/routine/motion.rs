//! Motion latch.
//!
//! The accelerometer reports raw acceleration at ~10 Hz. A sample counts as
//! movement when the change in acceleration magnitude since the previous
//! sample exceeds a threshold; the latch then reads "moving" for a trailing
//! window after the most recent qualifying sample.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MOTION_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MOTION_WINDOW_SECS: u64 = 3;

/// One accelerometer reading, already reduced to a magnitude delta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub magnitude_delta: f64,
    pub at: NaiveDateTime,
}

/// Turns raw `(x, y, z)` accelerations into magnitude deltas.
#[derive(Debug, Clone, Default)]
pub struct AccelerationTracker {
    last_magnitude: f64,
}

impl AccelerationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute change in magnitude since the previous reading.
    pub fn delta(&mut self, x: f64, y: f64, z: f64) -> f64 {
        let magnitude = (x * x + y * y + z * z).sqrt();
        let delta = (magnitude - self.last_magnitude).abs();
        self.last_magnitude = magnitude;
        delta
    }

    pub fn sample(&mut self, x: f64, y: f64, z: f64, at: NaiveDateTime) -> MotionSample {
        MotionSample {
            magnitude_delta: self.delta(x, y, z),
            at,
        }
    }
}

/// Debounced "currently moving" flag.
#[derive(Debug, Clone)]
pub struct MotionLatch {
    threshold: f64,
    window: Duration,
    last_motion_at: Option<NaiveDateTime>,
}

impl MotionLatch {
    pub fn new(threshold: f64, window: std::time::Duration) -> Self {
        Self {
            threshold,
            window: Duration::from_std(window).unwrap_or(Duration::MAX),
            last_motion_at: None,
        }
    }

    /// Feed one sample. Returns `true` if it counted as movement.
    pub fn observe(&mut self, sample: MotionSample) -> bool {
        if sample.magnitude_delta <= self.threshold || sample.magnitude_delta.is_nan() {
            return false;
        }
        // Late samples never move the latch backwards.
        if self.last_motion_at.map_or(true, |last| sample.at > last) {
            self.last_motion_at = Some(sample.at);
        }
        true
    }

    /// True while `now` is inside the window opened by the last movement.
    pub fn is_moving(&self, now: NaiveDateTime) -> bool {
        match self.last_motion_at {
            Some(last) => now >= last && now - last < self.window,
            None => false,
        }
    }

    pub fn last_motion_at(&self) -> Option<NaiveDateTime> {
        self.last_motion_at
    }

    pub fn reset(&mut self) {
        self.last_motion_at = None;
    }
}

impl Default for MotionLatch {
    fn default() -> Self {
        Self::new(
            DEFAULT_MOTION_THRESHOLD,
            std::time::Duration::from_secs(DEFAULT_MOTION_WINDOW_SECS),
        )
    }
}
