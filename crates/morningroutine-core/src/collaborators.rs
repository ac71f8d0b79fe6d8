//! Platform collaborators driven by the routine session.
//!
//! Every platform service (local notifications, camera recording, the
//! accelerometer) implements one of these traits. Calls are fire-and-forget:
//! the runtime never waits on a collaborator for anything but the immediate
//! `Result`, and an `Err` is turned into a non-fatal event.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::routine::NotificationRequest;
use crate::runtime::Registration;

/// Identifies a collaborator in logs, errors and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    Notifier,
    Recorder,
    MotionSensor,
}

impl Collaborator {
    /// The capability this collaborator needs the user to grant.
    pub fn capability(self) -> Capability {
        match self {
            Collaborator::Notifier => Capability::Notifications,
            Collaborator::Recorder => Capability::Camera,
            Collaborator::MotionSensor => Capability::Motion,
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collaborator::Notifier => "notifier",
            Collaborator::Recorder => "recorder",
            Collaborator::MotionSensor => "motion sensor",
        };
        f.write_str(name)
    }
}

/// A platform capability gated behind a user permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Notifications,
    Camera,
    Motion,
}

impl std::str::FromStr for Capability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "notifications" | "notification" => Ok(Capability::Notifications),
            "camera" => Ok(Capability::Camera),
            "motion" => Ok(Capability::Motion),
            other => Err(format!("unknown capability: {other}")),
        }
    }
}

/// Authorization status reported by a collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not been asked yet.
    #[default]
    NotDetermined,
    Authorized,
    Denied,
}

impl AuthorizationStatus {
    /// Anything short of an explicit denial is treated as usable.
    pub fn is_usable(self) -> bool {
        self != AuthorizationStatus::Denied
    }
}

/// Current authorization for each capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub notifications: AuthorizationStatus,
    pub camera: AuthorizationStatus,
    pub motion: AuthorizationStatus,
}

impl Permissions {
    pub fn get(&self, capability: Capability) -> AuthorizationStatus {
        match capability {
            Capability::Notifications => self.notifications,
            Capability::Camera => self.camera,
            Capability::Motion => self.motion,
        }
    }

    pub fn set(&mut self, capability: Capability, status: AuthorizationStatus) {
        match capability {
            Capability::Notifications => self.notifications = status,
            Capability::Camera => self.camera = status,
            Capability::Motion => self.motion = status,
        }
    }
}

/// Local notification scheduling.
///
/// Both calls are idempotent: scheduling an id that is already pending
/// replaces it, cancelling an unknown id does nothing.
pub trait Notifier: Send {
    /// Schedule (or replace) the notification described by `request`.
    fn schedule(&mut self, request: &NotificationRequest) -> Result<(), CollaboratorError>;

    /// Remove a pending notification.
    fn cancel(&mut self, id: &str) -> Result<(), CollaboratorError>;
}

/// Video capture.
pub trait Recorder: Send {
    fn start(&mut self) -> Result<(), CollaboratorError>;

    fn stop(&mut self) -> Result<(), CollaboratorError>;
}

/// Accelerometer polling.
///
/// The sensor receives a [`Registration`] that does not keep the session
/// alive; samples sent after the session is gone are dropped.
pub trait MotionSensor: Send {
    fn start(&mut self, registration: Registration) -> Result<(), CollaboratorError>;

    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_denied_is_unusable() {
        assert!(AuthorizationStatus::NotDetermined.is_usable());
        assert!(AuthorizationStatus::Authorized.is_usable());
        assert!(!AuthorizationStatus::Denied.is_usable());
    }

    #[test]
    fn permissions_get_set() {
        let mut perms = Permissions::default();
        perms.set(Capability::Camera, AuthorizationStatus::Denied);
        assert_eq!(perms.get(Capability::Camera), AuthorizationStatus::Denied);
        assert_eq!(perms.get(Capability::Motion), AuthorizationStatus::NotDetermined);
    }

    #[test]
    fn collaborator_maps_to_capability() {
        assert_eq!(Collaborator::Recorder.capability(), Capability::Camera);
        assert_eq!(Collaborator::MotionSensor.capability(), Capability::Motion);
        assert_eq!("Camera".parse::<Capability>(), Ok(Capability::Camera));
        assert!("microphone".parse::<Capability>().is_err());
    }
}
