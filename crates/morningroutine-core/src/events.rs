use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::collaborators::{AuthorizationStatus, Capability, Collaborator};
use crate::routine::RoutineState;

/// Every state change in the session produces an Event.
/// Presentation layers subscribe to them; nothing reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    AlarmSet {
        wake_time: NaiveTime,
        repeats: bool,
        fire_at: NaiveDateTime,
        at: NaiveDateTime,
    },
    AlarmFiring {
        notification_id: String,
        snooze_count: u32,
        can_snooze: bool,
        at: NaiveDateTime,
    },
    Snoozed {
        count: u32,
        remaining_snoozes: u32,
        fire_at: NaiveDateTime,
        at: NaiveDateTime,
    },
    /// Snooze pressed with no budget left.
    SnoozeRejected {
        count: u32,
        max: u32,
        at: NaiveDateTime,
    },
    ExerciseStarted {
        duration_secs: u64,
        recording: bool,
        motion_gating: bool,
        at: NaiveDateTime,
    },
    ExerciseTicked {
        remaining_secs: u64,
        progress: f64,
        is_moving: bool,
        at: NaiveDateTime,
    },
    /// No movement detected during a tick. Repeats every tick until the
    /// user moves again.
    ContinueExercising {
        remaining_secs: u64,
        message: String,
        at: NaiveDateTime,
    },
    ExerciseCompleted {
        duration_secs: u64,
        message: String,
        at: NaiveDateTime,
    },
    ExerciseStopped {
        remaining_secs: u64,
        at: NaiveDateTime,
    },
    /// Completion grace period ended and the exercise screen went away.
    RoutineDismissed {
        state: RoutineState,
        at: NaiveDateTime,
    },
    PermissionChanged {
        capability: Capability,
        status: AuthorizationStatus,
        at: NaiveDateTime,
    },
    /// A collaborator reported a failure. The session carries on.
    CollaboratorFailed {
        collaborator: Collaborator,
        message: String,
        at: NaiveDateTime,
    },
    StateSnapshot {
        state: RoutineState,
        wake_time: Option<NaiveTime>,
        snooze_count: u32,
        remaining_snoozes: u32,
        exercise_remaining_secs: Option<u64>,
        exercise_countdown: Option<String>,
        exercise_progress: Option<f64>,
        is_moving: bool,
        at: NaiveDateTime,
    },
}

impl Event {
    /// Snake-case name of the variant, as used in the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AlarmSet { .. } => "alarm_set",
            Event::AlarmFiring { .. } => "alarm_firing",
            Event::Snoozed { .. } => "snoozed",
            Event::SnoozeRejected { .. } => "snooze_rejected",
            Event::ExerciseStarted { .. } => "exercise_started",
            Event::ExerciseTicked { .. } => "exercise_ticked",
            Event::ContinueExercising { .. } => "continue_exercising",
            Event::ExerciseCompleted { .. } => "exercise_completed",
            Event::ExerciseStopped { .. } => "exercise_stopped",
            Event::RoutineDismissed { .. } => "routine_dismissed",
            Event::PermissionChanged { .. } => "permission_changed",
            Event::CollaboratorFailed { .. } => "collaborator_failed",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn kind_matches_serde_tag() {
        let at = NaiveDate::from_ymd_opt(2026, 3, 14)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        let event = Event::SnoozeRejected { count: 2, max: 2, at };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind());
    }
}
