//! # Morning Routine Core Library
//!
//! This library provides the logic behind the Morning Routine wake-up app:
//! an alarm that can only be put to rest by a timed, motion-checked exercise
//! session. Platform services (notifications, camera, accelerometer) are
//! collaborators behind traits; the CLI and any GUI are thin layers over the
//! same core.
//!
//! ## Architecture
//!
//! - **Routine Session**: A state machine over alarm, snooze budget and
//!   exercise countdown. Operations return the commands and events they
//!   produce instead of performing them.
//! - **Runtime**: A single queue that serializes every input into the
//!   session and executes commands against the collaborators
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`RoutineSession`]: Core state machine
//! - [`RoutineService`]: Serialized runtime owning the session
//! - [`Config`]: Application configuration management
//! - [`Notifier`], [`Recorder`], [`MotionSensor`]: Collaborator traits

pub mod collaborators;
pub mod error;
pub mod events;
pub mod routine;
pub mod runtime;
pub mod storage;

pub use collaborators::{
    AuthorizationStatus, Capability, Collaborator, MotionSensor, Notifier, Permissions, Recorder,
};
pub use error::{CollaboratorError, ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use routine::{
    AlarmSchedule, Command, Effects, Input, MotionSample, NotificationAction, NotificationRequest,
    Rejection, RoutineSession, RoutineSettings, RoutineState,
};
pub use runtime::{spawn_clock, Registration, RoutineHandle, RoutineService};
pub use storage::Config;
