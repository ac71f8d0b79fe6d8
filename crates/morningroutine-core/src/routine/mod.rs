mod clock;
mod effects;
mod exercise;
mod input;
mod motion;
mod notification;
mod schedule;
mod session;
mod snooze;

pub use clock::{Clock, ManualClock, SystemClock};
pub use effects::{Command, Effects, Rejection};
pub use exercise::{format_countdown, ExerciseSession, DEFAULT_EXERCISE_SECS};
pub use input::Input;
pub use motion::{
    AccelerationTracker, MotionLatch, MotionSample, DEFAULT_MOTION_THRESHOLD,
    DEFAULT_MOTION_WINDOW_SECS,
};
pub use notification::{
    alarm_actions, snooze_notification_id, snooze_slot, ActionButton, NotificationAction,
    NotificationContent, NotificationRequest, ALARM_NOTIFICATION_ID,
};
pub use schedule::{parse_wake_time, AlarmSchedule};
pub use session::{RoutineSession, RoutineSettings, RoutineState};
pub use snooze::{SnoozeState, DEFAULT_MAX_SNOOZES};
