use std::time::Duration;

use super::motion::MotionSample;
use super::notification::NotificationAction;
use super::schedule::AlarmSchedule;
use crate::collaborators::{AuthorizationStatus, Capability};
use crate::error::CollaboratorError;

/// Every message the session accepts. The runtime queues these and feeds
/// them to the session one at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    SetAlarm(AlarmSchedule),
    Snooze,
    StartExercise,
    StopExercise,
    /// Clock wake-up carrying the time elapsed since the previous one.
    Tick(Duration),
    /// The notifier delivered the notification with this id.
    AlarmFired(String),
    /// Grace period after completion ran out.
    Dismiss,
    Action(NotificationAction),
    MotionSample(MotionSample),
    Permission(Capability, AuthorizationStatus),
    CollaboratorFailed(CollaboratorError),
    /// Publish a `StateSnapshot` event.
    Snapshot,
    /// Stop the runtime loop. Ignored by the session itself.
    Shutdown,
}
