use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::notification::NotificationRequest;
use crate::events::Event;

/// Side effect the session asks a collaborator to perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    ScheduleNotification { request: NotificationRequest },
    CancelNotification { id: String },
    StartRecording,
    StopRecording,
    StartMotionUpdates,
    StopMotionUpdates,
    /// Deliver `Input::Dismiss` after `after`.
    ScheduleDismiss { after: Duration },
}

/// Why an operation did nothing.
///
/// These are policy boundaries, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    SnoozeBudgetExhausted,
    NoActiveExercise,
    ExerciseInProgress,
    NotAwaitingDismiss,
    NoAlarmSet,
    UnknownNotification,
    /// The snooze fire time does not fit a timestamp.
    IntervalOutOfRange,
}

/// Everything one operation produced, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
    pub rejection: Option<Rejection>,
}

impl Effects {
    pub(crate) fn rejected(rejection: Rejection) -> Self {
        Self {
            rejection: Some(rejection),
            ..Self::default()
        }
    }

    pub(crate) fn command(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub(crate) fn event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection.is_some()
    }

    /// Fold another operation's effects into this one.
    pub fn merge(&mut self, other: Effects) {
        self.commands.extend(other.commands);
        self.events.extend(other.events);
        if other.rejection.is_some() {
            self.rejection = other.rejection;
        }
    }
}
