use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The single active alarm.
///
/// Times are local wall-clock times; only hour and minute are significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSchedule {
    pub wake_time: NaiveTime,
    /// Fire every day at `wake_time` instead of once.
    pub repeats: bool,
}

impl AlarmSchedule {
    pub fn new(wake_time: NaiveTime, repeats: bool) -> Self {
        // Seconds are dropped so the trigger matches on hour:minute only.
        let wake_time = wake_time.with_second(0).unwrap_or(wake_time);
        let wake_time = wake_time.with_nanosecond(0).unwrap_or(wake_time);
        Self { wake_time, repeats }
    }

    /// Parse an `HH:MM` wake time.
    pub fn parse(input: &str, repeats: bool) -> Result<Self, ValidationError> {
        Ok(Self::new(parse_wake_time(input)?, repeats))
    }

    /// Next wall-clock instant at which the alarm fires.
    ///
    /// Today if `wake_time` is still ahead of `now`, tomorrow otherwise.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.wake_time);
        if today > now {
            today
        } else {
            today + Duration::days(1)
        }
    }

    /// `HH:MM` label.
    pub fn label(&self) -> String {
        self.wake_time.format("%H:%M").to_string()
    }
}

/// Parse `HH:MM` (or `H:MM`) into a time of day.
pub fn parse_wake_time(input: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(input.trim(), "%H:%M").map_err(|_| ValidationError::InvalidWakeTime {
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fires_today_when_still_ahead() {
        let schedule = AlarmSchedule::parse("07:00", true).unwrap();
        assert_eq!(schedule.next_fire_after(at(6, 30)), at(7, 0));
    }

    #[test]
    fn fires_tomorrow_when_passed_or_now() {
        let schedule = AlarmSchedule::parse("07:00", true).unwrap();
        let tomorrow = at(7, 0) + Duration::days(1);
        assert_eq!(schedule.next_fire_after(at(7, 0)), tomorrow);
        assert_eq!(schedule.next_fire_after(at(22, 15)), tomorrow);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_wake_time("7am").is_err());
        assert!(parse_wake_time("25:00").is_err());
        assert_eq!(
            parse_wake_time(" 6:05 ").unwrap(),
            NaiveTime::from_hms_opt(6, 5, 0).unwrap()
        );
    }

    #[test]
    fn seconds_are_truncated() {
        let schedule = AlarmSchedule::new(NaiveTime::from_hms_opt(7, 0, 42).unwrap(), false);
        assert_eq!(schedule.label(), "07:00");
        assert_eq!(schedule.wake_time.second(), 0);
    }
}
