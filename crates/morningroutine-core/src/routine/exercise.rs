use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Default exercise length: 20 minutes.
pub const DEFAULT_EXERCISE_SECS: u64 = 20 * 60;

/// A running (or just finished) exercise countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseSession {
    duration: Duration,
    remaining: Duration,
    active: bool,
    last_motion_at: Option<NaiveDateTime>,
    /// A start-recording command was issued for this session.
    pub(crate) recording: bool,
    /// A start-motion-updates command was issued for this session.
    pub(crate) tracking_motion: bool,
}

impl ExerciseSession {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            remaining: duration,
            active: true,
            last_motion_at: None,
            recording: false,
            tracking_motion: false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn remaining(&self) -> Duration {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_complete(&self) -> bool {
        !self.active && self.remaining.is_zero()
    }

    pub fn last_motion_at(&self) -> Option<NaiveDateTime> {
        self.last_motion_at
    }

    pub(crate) fn record_motion(&mut self, at: NaiveDateTime) {
        if self.last_motion_at.map_or(true, |last| at > last) {
            self.last_motion_at = Some(at);
        }
    }

    /// Count down by `elapsed`. Returns `true` exactly once, on the call
    /// that reaches zero.
    pub fn advance(&mut self, elapsed: Duration) -> bool {
        if !self.active {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.active = false;
            return true;
        }
        false
    }

    /// 0.0 .. 1.0 progress through the session.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        1.0 - self.remaining.as_secs_f64() / self.duration.as_secs_f64()
    }

    /// Whole minutes left, rounded down.
    pub fn minutes_remaining(&self) -> u64 {
        self.remaining.as_secs() / 60
    }

    /// `MM:SS` countdown label.
    pub fn countdown_label(&self) -> String {
        format_countdown(self.remaining)
    }
}

/// Format a duration as `MM:SS`. Minutes are not capped at 59.
pub fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
