//! Notification identifiers, content and user actions.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of the main wake-up notification.
pub const ALARM_NOTIFICATION_ID: &str = "morning_alarm";

const SNOOZE_NOTIFICATION_PREFIX: &str = "snooze_alarm_";

/// Identifier of the notification scheduled by the `slot`-th snooze (1-based).
pub fn snooze_notification_id(slot: u32) -> String {
    format!("{SNOOZE_NOTIFICATION_PREFIX}{slot}")
}

/// Slot number encoded in a snooze notification id.
pub fn snooze_slot(id: &str) -> Option<u32> {
    id.strip_prefix(SNOOZE_NOTIFICATION_PREFIX)?.parse().ok()
}

/// What the notification shows and which actions it offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    /// Category that carries the snooze / start-exercise actions.
    pub category: String,
}

impl Default for NotificationContent {
    fn default() -> Self {
        Self {
            title: "🌅 Time to Exercise!".into(),
            body: "Your morning routine is waiting. Let's get moving!".into(),
            category: "ALARM_CATEGORY".into(),
        }
    }
}

/// A request handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub id: String,
    pub fire_at: NaiveDateTime,
    pub repeating: bool,
    pub content: NotificationContent,
    pub actions: Vec<ActionButton>,
}

/// A button shown on a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    /// Platform identifier reported back when the button is picked.
    pub id: String,
    pub title: String,
}

/// Buttons of the alarm category: snooze first, then start exercise.
pub fn alarm_actions(snooze_interval: Duration) -> Vec<ActionButton> {
    let minutes = snooze_interval.as_secs() / 60;
    NotificationAction::ALL
        .into_iter()
        .map(|action| ActionButton {
            id: action.platform_id().to_string(),
            title: action.title(minutes),
        })
        .collect()
}

/// Action the user picked on a delivered notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationAction {
    Snooze,
    StartExercise,
}

impl NotificationAction {
    pub const ALL: [NotificationAction; 2] =
        [NotificationAction::Snooze, NotificationAction::StartExercise];

    /// Identifier registered with the platform category.
    pub fn platform_id(self) -> &'static str {
        match self {
            NotificationAction::Snooze => "SNOOZE_ACTION",
            NotificationAction::StartExercise => "START_EXERCISE_ACTION",
        }
    }

    /// Button title shown on the notification.
    pub fn title(self, snooze_minutes: u64) -> String {
        match self {
            NotificationAction::Snooze => format!("Snooze ({snooze_minutes} min)"),
            NotificationAction::StartExercise => "Start Exercise".into(),
        }
    }
}

impl FromStr for NotificationAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snooze" => Ok(NotificationAction::Snooze),
            "start_exercise" => Ok(NotificationAction::StartExercise),
            other => NotificationAction::ALL
                .into_iter()
                .find(|action| action.platform_id() == other)
                .ok_or_else(|| ValidationError::UnknownAction(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snooze_ids_round_trip_slot() {
        assert_eq!(snooze_notification_id(2), "snooze_alarm_2");
        assert_eq!(snooze_slot("snooze_alarm_2"), Some(2));
        assert_eq!(snooze_slot(ALARM_NOTIFICATION_ID), None);
        assert_eq!(snooze_slot("snooze_alarm_x"), None);
    }

    #[test]
    fn actions_accept_both_spellings() {
        assert_eq!("snooze".parse::<NotificationAction>().unwrap(), NotificationAction::Snooze);
        assert_eq!(
            "START_EXERCISE_ACTION".parse::<NotificationAction>().unwrap(),
            NotificationAction::StartExercise
        );
        assert!("dismiss".parse::<NotificationAction>().is_err());
    }

    #[test]
    fn snooze_title_mentions_interval() {
        assert_eq!(NotificationAction::Snooze.title(2), "Snooze (2 min)");
    }

    #[test]
    fn alarm_buttons_round_trip_through_parse() {
        let buttons = alarm_actions(Duration::from_secs(300));
        assert_eq!(buttons[0].title, "Snooze (5 min)");
        assert_eq!(buttons[1].title, "Start Exercise");
        let parsed: Vec<NotificationAction> =
            buttons.iter().map(|b| b.id.parse().unwrap()).collect();
        assert_eq!(parsed, NotificationAction::ALL);
    }
}
