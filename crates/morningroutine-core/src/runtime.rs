//! Serialized runtime around a [`RoutineSession`].
//!
//! All inputs (user actions, clock ticks, motion samples, collaborator
//! reports) go through one unbounded queue and are applied to the session one
//! at a time. Commands the session emits are executed against the
//! collaborators right away; failures come back as `CollaboratorFailed`
//! inputs and are handled before the next queued input. Events fan out to
//! subscribers over a broadcast channel.
//!
//! ## Usage
//!
//! ```ignore
//! let (service, handle) = RoutineService::new(session, notifier, recorder, sensor);
//! let task = tokio::spawn(service.run());
//! let _clock = spawn_clock(handle.registration(), Duration::from_secs(1));
//! handle.start_exercise()?;
//! ```

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::collaborators::{MotionSensor, Notifier, Recorder};
use crate::error::{CollaboratorError, CoreError};
use crate::events::Event;
use crate::routine::{
    AlarmSchedule, Command, Input, MotionSample, NotificationAction, RoutineSession,
};

/// Capacity of the event broadcast buffer. Slow subscribers lag and skip.
const EVENT_BUFFER: usize = 256;

/// Non-owning entry point into the input queue.
///
/// Handed to sensors and clocks. It does not keep the service alive: once
/// every [`RoutineHandle`] is dropped, sends through a registration fail.
#[derive(Debug, Clone)]
pub struct Registration {
    tx: mpsc::WeakUnboundedSender<Input>,
}

impl Registration {
    /// Queue an input. Returns `false` once the service is gone.
    pub fn send(&self, input: Input) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.send(input).is_ok(),
            None => false,
        }
    }

    pub fn deliver(&self, sample: MotionSample) -> bool {
        self.send(Input::MotionSample(sample))
    }
}

/// Owning handle to a running service.
#[derive(Debug, Clone)]
pub struct RoutineHandle {
    tx: mpsc::UnboundedSender<Input>,
    events: broadcast::Sender<Event>,
}

impl RoutineHandle {
    pub fn send(&self, input: Input) -> Result<(), CoreError> {
        self.tx.send(input).map_err(|_| CoreError::ServiceClosed)
    }

    pub fn set_alarm(&self, schedule: AlarmSchedule) -> Result<(), CoreError> {
        self.send(Input::SetAlarm(schedule))
    }

    pub fn snooze(&self) -> Result<(), CoreError> {
        self.send(Input::Snooze)
    }

    pub fn start_exercise(&self) -> Result<(), CoreError> {
        self.send(Input::StartExercise)
    }

    pub fn stop_exercise(&self) -> Result<(), CoreError> {
        self.send(Input::StopExercise)
    }

    pub fn action(&self, action: NotificationAction) -> Result<(), CoreError> {
        self.send(Input::Action(action))
    }

    pub fn alarm_fired(&self, notification_id: impl Into<String>) -> Result<(), CoreError> {
        self.send(Input::AlarmFired(notification_id.into()))
    }

    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.send(Input::Shutdown)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn registration(&self) -> Registration {
        Registration {
            tx: self.tx.downgrade(),
        }
    }
}

/// Owns the session and its collaborators.
pub struct RoutineService {
    session: RoutineSession,
    notifier: Box<dyn Notifier>,
    recorder: Box<dyn Recorder>,
    sensor: Box<dyn MotionSensor>,
    inputs: mpsc::UnboundedReceiver<Input>,
    registration: Registration,
    events: broadcast::Sender<Event>,
    /// Pending return-to-idle timer from the latest completion.
    dismiss: Option<JoinHandle<()>>,
}

impl RoutineService {
    pub fn new(
        session: RoutineSession,
        notifier: Box<dyn Notifier>,
        recorder: Box<dyn Recorder>,
        sensor: Box<dyn MotionSensor>,
    ) -> (Self, RoutineHandle) {
        let (tx, inputs) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let handle = RoutineHandle {
            tx,
            events: events.clone(),
        };
        let service = Self {
            session,
            notifier,
            recorder,
            sensor,
            inputs,
            registration: handle.registration(),
            events,
            dismiss: None,
        };
        (service, handle)
    }

    pub fn session(&self) -> &RoutineSession {
        &self.session
    }

    /// Process inputs until `Shutdown` arrives or every handle is dropped.
    /// Returns the session in its final state.
    pub async fn run(mut self) -> RoutineSession {
        info!("Routine service started");
        while let Some(input) = self.inputs.recv().await {
            if matches!(input, Input::Shutdown) {
                break;
            }
            self.process(input);
        }
        self.sensor.stop();
        if let Some(dismiss) = self.dismiss.take() {
            dismiss.abort();
        }
        info!(state = ?self.session.state(), "Routine service stopped");
        self.session
    }

    /// Apply one input and everything it triggers.
    pub fn process(&mut self, input: Input) {
        let mut pending = vec![input];
        while let Some(input) = pending.pop() {
            let effects = self.session.handle(input);
            if let Some(rejection) = effects.rejection {
                debug!(?rejection, "Input rejected");
            }

            let mut failures = Vec::new();
            for command in effects.commands {
                if let Err(err) = self.execute(command) {
                    failures.push(Input::CollaboratorFailed(err));
                }
            }
            for event in effects.events {
                // No subscribers is fine.
                let _ = self.events.send(event);
            }
            // Handle failures in the order they happened.
            failures.reverse();
            pending.extend(failures);
        }
    }

    fn execute(&mut self, command: Command) -> Result<(), CollaboratorError> {
        debug!(?command, "Executing command");
        match command {
            Command::ScheduleNotification { request } => self.notifier.schedule(&request),
            Command::CancelNotification { id } => self.notifier.cancel(&id),
            Command::StartRecording => self.recorder.start(),
            Command::StopRecording => self.recorder.stop(),
            Command::StartMotionUpdates => self.sensor.start(self.registration.clone()),
            Command::StopMotionUpdates => {
                self.sensor.stop();
                Ok(())
            }
            Command::ScheduleDismiss { after } => {
                // Only the latest completion may dismiss.
                if let Some(stale) = self.dismiss.take() {
                    stale.abort();
                }
                let registration = self.registration.clone();
                self.dismiss = Some(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    registration.send(Input::Dismiss);
                }));
                Ok(())
            }
        }
    }
}

/// Periodic tick source. Ends on its own once the service is gone.
pub fn spawn_clock(registration: Registration, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            if !registration.send(Input::Tick(period)) {
                debug!("Clock stopped: service gone");
                break;
            }
        }
    })
}
