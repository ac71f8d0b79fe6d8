use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Default snooze budget per alarm cycle.
pub const DEFAULT_MAX_SNOOZES: u32 = 2;

/// Snooze budget. `count` never exceeds `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnoozeState {
    count: u32,
    max: u32,
}

impl SnoozeState {
    pub fn new(max: u32) -> Self {
        Self { count: 0, max }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn can_snooze(&self) -> bool {
        self.count < self.max
    }

    pub fn remaining(&self) -> u32 {
        self.max - self.count
    }

    /// Consume one snooze. Returns the new count, or `None` once the budget
    /// is spent.
    pub fn try_snooze(&mut self) -> Option<u32> {
        if !self.can_snooze() {
            return None;
        }
        self.count += 1;
        Some(self.count)
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Every slot a snooze notification can occupy.
    pub fn slots(&self) -> RangeInclusive<u32> {
        1..=self.max
    }
}

impl Default for SnoozeState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SNOOZES)
    }
}
