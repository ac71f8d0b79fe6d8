//! Routine session state machine.
//!
//! The session owns the alarm schedule, the snooze budget, the exercise
//! countdown and the motion latch. It never talks to a platform service
//! directly: every operation returns [`Effects`] listing the commands for the
//! collaborators and the events for subscribers. Like the timer engine it is
//! modelled on, it has no internal threads; the caller feeds it `tick()`.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> AlarmSet -> AlarmFiring <-> Snoozed -> ExerciseActive -> ExerciseComplete
//!                                                      |                  |
//!                                                      +--> AlarmSet/Idle <+
//! ```

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::effects::{Command, Effects, Rejection};
use super::exercise::{ExerciseSession, DEFAULT_EXERCISE_SECS};
use super::input::Input;
use super::motion::{MotionLatch, MotionSample, DEFAULT_MOTION_THRESHOLD, DEFAULT_MOTION_WINDOW_SECS};
use super::notification::{
    alarm_actions, snooze_notification_id, snooze_slot, NotificationAction, NotificationContent,
    NotificationRequest, ALARM_NOTIFICATION_ID,
};
use super::schedule::AlarmSchedule;
use super::snooze::{SnoozeState, DEFAULT_MAX_SNOOZES};
use crate::collaborators::{AuthorizationStatus, Capability, Permissions};
use crate::error::CollaboratorError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineState {
    Idle,
    AlarmSet,
    AlarmFiring,
    Snoozed,
    ExerciseActive,
    /// Countdown reached zero; waiting out the dismiss grace period.
    ExerciseComplete,
}

/// Tunables for a session. Built from [`crate::Config`] in the app.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineSettings {
    pub max_snoozes: u32,
    pub snooze_interval: Duration,
    pub exercise_duration: Duration,
    /// Grace period between completion and auto-dismiss.
    pub dismiss_delay: Duration,
    pub motion_threshold: f64,
    pub motion_window: Duration,
    pub notification: NotificationContent,
}

impl Default for RoutineSettings {
    fn default() -> Self {
        Self {
            max_snoozes: DEFAULT_MAX_SNOOZES,
            snooze_interval: Duration::from_secs(120),
            exercise_duration: Duration::from_secs(DEFAULT_EXERCISE_SECS),
            dismiss_delay: Duration::from_secs(2),
            motion_threshold: DEFAULT_MOTION_THRESHOLD,
            motion_window: Duration::from_secs(DEFAULT_MOTION_WINDOW_SECS),
            notification: NotificationContent::default(),
        }
    }
}

pub struct RoutineSession {
    settings: RoutineSettings,
    clock: Box<dyn Clock>,
    state: RoutineState,
    schedule: Option<AlarmSchedule>,
    snooze: SnoozeState,
    exercise: Option<ExerciseSession>,
    motion: MotionLatch,
    permissions: Permissions,
}

impl std::fmt::Debug for RoutineSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineSession")
            .field("state", &self.state)
            .field("schedule", &self.schedule)
            .field("snooze", &self.snooze)
            .field("exercise", &self.exercise)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

impl RoutineSession {
    /// Create an idle session on the system clock.
    pub fn new(settings: RoutineSettings) -> Self {
        Self::with_clock(settings, Box::new(SystemClock))
    }

    pub fn with_clock(settings: RoutineSettings, clock: Box<dyn Clock>) -> Self {
        let snooze = SnoozeState::new(settings.max_snoozes);
        let motion = MotionLatch::new(settings.motion_threshold, settings.motion_window);
        Self {
            settings,
            clock,
            state: RoutineState::Idle,
            schedule: None,
            snooze,
            exercise: None,
            motion,
            permissions: Permissions::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> RoutineState {
        self.state
    }

    pub fn schedule(&self) -> Option<&AlarmSchedule> {
        self.schedule.as_ref()
    }

    pub fn settings(&self) -> &RoutineSettings {
        &self.settings
    }

    pub fn snooze_count(&self) -> u32 {
        self.snooze.count()
    }

    pub fn can_snooze(&self) -> bool {
        self.snooze.can_snooze()
    }

    pub fn remaining_snoozes(&self) -> u32 {
        self.snooze.remaining()
    }

    pub fn exercise(&self) -> Option<&ExerciseSession> {
        self.exercise.as_ref()
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_moving(self.clock.now())
    }

    /// Whether missing movement raises warnings.
    pub fn motion_gating(&self) -> bool {
        self.permissions.motion.is_usable()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let exercise = self.exercise.as_ref();
        Event::StateSnapshot {
            state: self.state,
            wake_time: self.schedule.map(|s| s.wake_time),
            snooze_count: self.snooze.count(),
            remaining_snoozes: self.snooze.remaining(),
            exercise_remaining_secs: exercise.map(|e| e.remaining().as_secs()),
            exercise_countdown: exercise.map(|e| e.countdown_label()),
            exercise_progress: exercise.map(|e| e.progress()),
            is_moving: self.is_moving(),
            at: self.clock.now(),
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    /// Apply one queued input.
    pub fn handle(&mut self, input: Input) -> Effects {
        match input {
            Input::SetAlarm(schedule) => self.set_alarm(schedule),
            Input::Snooze => self.snooze(),
            Input::StartExercise => self.start_exercise(),
            Input::StopExercise => self.stop_exercise(),
            Input::Tick(elapsed) => self.tick(elapsed),
            Input::AlarmFired(id) => self.alarm_fired(&id),
            Input::Dismiss => self.dismiss(),
            Input::Action(action) => self.action(action),
            Input::MotionSample(sample) => self.motion_sample(sample),
            Input::Permission(capability, status) => self.set_permission(capability, status),
            Input::CollaboratorFailed(err) => self.collaborator_failed(err),
            Input::Snapshot => {
                let mut fx = Effects::default();
                fx.event(self.snapshot());
                fx
            }
            Input::Shutdown => Effects::default(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the alarm. Valid from any state.
    ///
    /// Cancels the previous alarm and every snooze slot before scheduling the
    /// new one, so nothing from the superseded chain can fire.
    pub fn set_alarm(&mut self, schedule: AlarmSchedule) -> Effects {
        let now = self.clock.now();
        let mut fx = Effects::default();

        if self.exercise.is_some() {
            self.end_exercise(&mut fx);
        }

        self.snooze.reset();
        fx.command(Command::CancelNotification {
            id: ALARM_NOTIFICATION_ID.into(),
        });
        self.cancel_snooze_slots(&mut fx);

        let fire_at = schedule.next_fire_after(now);
        fx.command(Command::ScheduleNotification {
            request: self.notification(ALARM_NOTIFICATION_ID.into(), fire_at, schedule.repeats),
        });

        self.schedule = Some(schedule);
        self.state = RoutineState::AlarmSet;
        info!(wake_time = %schedule.label(), repeats = schedule.repeats, %fire_at, "Alarm set");
        fx.event(Event::AlarmSet {
            wake_time: schedule.wake_time,
            repeats: schedule.repeats,
            fire_at,
            at: now,
        });
        fx
    }

    /// Defer the alarm by the snooze interval.
    ///
    /// Once the budget is spent this does nothing besides reporting
    /// [`Rejection::SnoozeBudgetExhausted`]. Without an alarm there is
    /// nothing to defer.
    pub fn snooze(&mut self) -> Effects {
        let now = self.clock.now();
        if self.exercise.is_some() {
            debug!(state = ?self.state, "Snooze ignored during exercise");
            return Effects::rejected(Rejection::ExerciseInProgress);
        }
        if self.schedule.is_none() {
            debug!("Snooze ignored without an alarm");
            return Effects::rejected(Rejection::NoAlarmSet);
        }
        let Some(fire_at) = offset(now, self.settings.snooze_interval) else {
            warn!(interval = ?self.settings.snooze_interval, "Snooze interval out of range");
            return Effects::rejected(Rejection::IntervalOutOfRange);
        };

        let Some(count) = self.snooze.try_snooze() else {
            debug!(count = self.snooze.count(), "Snooze budget exhausted");
            let mut fx = Effects::rejected(Rejection::SnoozeBudgetExhausted);
            fx.event(Event::SnoozeRejected {
                count: self.snooze.count(),
                max: self.snooze.max(),
                at: now,
            });
            return fx;
        };

        let mut fx = Effects::default();
        fx.command(Command::ScheduleNotification {
            request: self.notification(snooze_notification_id(count), fire_at, false),
        });
        self.state = RoutineState::Snoozed;
        info!(count, remaining = self.snooze.remaining(), %fire_at, "Snoozed");
        fx.event(Event::Snoozed {
            count,
            remaining_snoozes: self.snooze.remaining(),
            fire_at,
            at: now,
        });
        fx
    }

    /// Begin the exercise countdown. Valid from any state.
    ///
    /// Restarting while already exercising resets the countdown without
    /// restarting the recorder.
    pub fn start_exercise(&mut self) -> Effects {
        let now = self.clock.now();
        let mut fx = Effects::default();

        self.snooze.reset();
        self.cancel_snooze_slots(&mut fx);

        let mut exercise = ExerciseSession::new(self.settings.exercise_duration);
        match self.exercise.take() {
            Some(previous) if previous.is_active() => {
                exercise.recording = previous.recording;
                exercise.tracking_motion = previous.tracking_motion;
            }
            _ => {
                self.motion.reset();
                if self.permissions.camera.is_usable() {
                    fx.command(Command::StartRecording);
                    exercise.recording = true;
                }
                if self.motion_gating() {
                    fx.command(Command::StartMotionUpdates);
                    exercise.tracking_motion = true;
                }
            }
        }

        info!(
            duration_secs = exercise.duration().as_secs(),
            recording = exercise.recording,
            motion_gating = exercise.tracking_motion,
            "Exercise started"
        );
        fx.event(Event::ExerciseStarted {
            duration_secs: exercise.duration().as_secs(),
            recording: exercise.recording,
            motion_gating: exercise.tracking_motion,
            at: now,
        });
        self.exercise = Some(exercise);
        self.state = RoutineState::ExerciseActive;
        fx
    }

    /// Advance the exercise countdown. Only valid in `ExerciseActive`.
    pub fn tick(&mut self, elapsed: Duration) -> Effects {
        if self.state != RoutineState::ExerciseActive {
            return Effects::rejected(Rejection::NoActiveExercise);
        }
        let Some(exercise) = self.exercise.as_mut() else {
            return Effects::rejected(Rejection::NoActiveExercise);
        };

        let now = self.clock.now();
        let mut fx = Effects::default();
        let completed = exercise.advance(elapsed);
        let is_moving = self.motion.is_moving(now);

        if completed {
            let duration_secs = exercise.duration().as_secs();
            let (recording, tracking) = (exercise.recording, exercise.tracking_motion);
            if recording {
                fx.command(Command::StopRecording);
            }
            if tracking {
                fx.command(Command::StopMotionUpdates);
            }
            exercise.recording = false;
            exercise.tracking_motion = false;
            self.motion.reset();
            fx.command(Command::ScheduleDismiss {
                after: self.settings.dismiss_delay,
            });
            self.state = RoutineState::ExerciseComplete;
            info!(duration_secs, "Exercise completed");
            fx.event(Event::ExerciseCompleted {
                duration_secs,
                message: format!(
                    "🎉 Congratulations! You've completed your {}-minute morning exercise!",
                    duration_secs / 60
                ),
                at: now,
            });
            return fx;
        }

        fx.event(Event::ExerciseTicked {
            remaining_secs: exercise.remaining().as_secs(),
            progress: exercise.progress(),
            is_moving,
            at: now,
        });
        if exercise.tracking_motion && !is_moving {
            fx.event(Event::ContinueExercising {
                remaining_secs: exercise.remaining().as_secs(),
                message: format!(
                    "Please continue exercising! You have {} minutes remaining.",
                    exercise.minutes_remaining()
                ),
                at: now,
            });
        }
        fx
    }

    /// Abandon the running exercise. Only valid in `ExerciseActive`.
    pub fn stop_exercise(&mut self) -> Effects {
        if self.state != RoutineState::ExerciseActive {
            return Effects::rejected(Rejection::NoActiveExercise);
        }
        let now = self.clock.now();
        let mut fx = Effects::default();
        let remaining_secs = self
            .exercise
            .as_ref()
            .map(|e| e.remaining().as_secs())
            .unwrap_or(0);
        self.end_exercise(&mut fx);
        self.state = self.resting_state();
        info!(remaining_secs, next = ?self.state, "Exercise stopped");
        fx.event(Event::ExerciseStopped {
            remaining_secs,
            at: now,
        });
        fx
    }

    /// Leave `ExerciseComplete` once the grace period has passed.
    pub fn dismiss(&mut self) -> Effects {
        if self.state != RoutineState::ExerciseComplete {
            return Effects::rejected(Rejection::NotAwaitingDismiss);
        }
        let now = self.clock.now();
        self.exercise = None;
        self.state = self.resting_state();
        info!(next = ?self.state, "Routine dismissed");
        let mut fx = Effects::default();
        fx.event(Event::RoutineDismissed {
            state: self.state,
            at: now,
        });
        fx
    }

    /// The notifier delivered one of our notifications.
    pub fn alarm_fired(&mut self, notification_id: &str) -> Effects {
        if notification_id != ALARM_NOTIFICATION_ID && snooze_slot(notification_id).is_none() {
            debug!(notification_id, "Ignoring unknown notification");
            return Effects::rejected(Rejection::UnknownNotification);
        }
        if self.exercise.is_some() {
            debug!(notification_id, "Alarm fired during exercise");
            return Effects::rejected(Rejection::ExerciseInProgress);
        }
        if self.schedule.is_none() {
            return Effects::rejected(Rejection::NoAlarmSet);
        }

        self.state = RoutineState::AlarmFiring;
        info!(notification_id, snooze_count = self.snooze.count(), "Alarm firing");
        let mut fx = Effects::default();
        fx.event(Event::AlarmFiring {
            notification_id: notification_id.to_string(),
            snooze_count: self.snooze.count(),
            can_snooze: self.snooze.can_snooze(),
            at: self.clock.now(),
        });
        fx
    }

    /// Route a notification action to the matching operation.
    pub fn action(&mut self, action: NotificationAction) -> Effects {
        match action {
            NotificationAction::Snooze => self.snooze(),
            NotificationAction::StartExercise => self.start_exercise(),
        }
    }

    /// Feed an accelerometer sample into the motion latch.
    pub fn motion_sample(&mut self, sample: MotionSample) -> Effects {
        if self.motion.observe(sample) {
            if let Some(exercise) = self.exercise.as_mut() {
                exercise.record_motion(sample.at);
            }
        }
        Effects::default()
    }

    /// A collaborator reported a new authorization status.
    ///
    /// Denied motion turns off motion gating; denied camera drops recording.
    /// The exercise itself keeps running either way.
    pub fn set_permission(&mut self, capability: Capability, status: AuthorizationStatus) -> Effects {
        let mut fx = Effects::default();
        if self.permissions.get(capability) == status {
            return fx;
        }
        self.permissions.set(capability, status);
        info!(?capability, ?status, "Permission changed");

        if !status.is_usable() {
            if let Some(exercise) = self.exercise.as_mut() {
                match capability {
                    Capability::Motion if exercise.tracking_motion => {
                        exercise.tracking_motion = false;
                        self.motion.reset();
                        fx.command(Command::StopMotionUpdates);
                    }
                    Capability::Camera if exercise.recording => {
                        exercise.recording = false;
                        fx.command(Command::StopRecording);
                    }
                    _ => {}
                }
            }
        }

        fx.event(Event::PermissionChanged {
            capability,
            status,
            at: self.clock.now(),
        });
        fx
    }

    /// Record a collaborator failure. The session state is left alone;
    /// an authorization failure also degrades the matching capability.
    pub fn collaborator_failed(&mut self, err: CollaboratorError) -> Effects {
        let collaborator = err.collaborator();
        warn!(%collaborator, error = %err, "Collaborator failed");

        let mut fx = Effects::default();
        fx.event(Event::CollaboratorFailed {
            collaborator,
            message: err.to_string(),
            at: self.clock.now(),
        });
        if matches!(err, CollaboratorError::Unauthorized { .. }) {
            fx.merge(self.set_permission(collaborator.capability(), AuthorizationStatus::Denied));
        }
        fx
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn notification(&self, id: String, fire_at: NaiveDateTime, repeating: bool) -> NotificationRequest {
        NotificationRequest {
            id,
            fire_at,
            repeating,
            content: self.settings.notification.clone(),
            actions: alarm_actions(self.settings.snooze_interval),
        }
    }

    fn cancel_snooze_slots(&self, fx: &mut Effects) {
        for slot in self.snooze.slots() {
            fx.command(Command::CancelNotification {
                id: snooze_notification_id(slot),
            });
        }
    }

    /// Stop whatever the current exercise started and drop it.
    fn end_exercise(&mut self, fx: &mut Effects) {
        if let Some(exercise) = self.exercise.take() {
            if exercise.recording {
                fx.command(Command::StopRecording);
            }
            if exercise.tracking_motion {
                fx.command(Command::StopMotionUpdates);
            }
        }
        self.motion.reset();
    }

    fn resting_state(&self) -> RoutineState {
        if self.schedule.is_some() {
            RoutineState::AlarmSet
        } else {
            RoutineState::Idle
        }
    }
}

/// `at + by`, or `None` when the result does not fit a timestamp.
fn offset(at: NaiveDateTime, by: Duration) -> Option<NaiveDateTime> {
    let delta = chrono::Duration::from_std(by).ok()?;
    at.checked_add_signed(delta)
}
