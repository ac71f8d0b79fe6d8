//! Terminal stand-ins for the platform collaborators.
//!
//! The notifier keeps pending notifications in memory and delivers them when
//! their fire time passes; the recorder and motion sensor only log.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Local;
use morningroutine_core::routine::{AccelerationTracker, MotionSample};
use morningroutine_core::{
    CollaboratorError, Input, MotionSensor, NotificationRequest, Notifier, Recorder, Registration,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

type Pending = Arc<Mutex<BTreeMap<String, NotificationRequest>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone, Default)]
pub struct ConsoleNotifier {
    pending: Pending,
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the earliest pending notification now.
    pub fn fire_next(&self, registration: &Registration) -> Option<String> {
        let id = {
            let pending = lock(&self.pending);
            pending
                .values()
                .min_by_key(|request| request.fire_at)
                .map(|request| request.id.clone())?
        };
        self.deliver(&id, registration);
        Some(id)
    }

    /// Poll once a second and deliver whatever is due.
    pub fn spawn_delivery(&self, registration: Registration) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                let now = Local::now().naive_local();
                let due: Vec<String> = lock(&notifier.pending)
                    .values()
                    .filter(|request| request.fire_at <= now)
                    .map(|request| request.id.clone())
                    .collect();
                for id in due {
                    if !notifier.deliver(&id, &registration) {
                        return;
                    }
                }
            }
        })
    }

    fn deliver(&self, id: &str, registration: &Registration) -> bool {
        {
            let mut pending = lock(&self.pending);
            let Some(request) = pending.remove(id) else {
                return true;
            };
            let buttons: Vec<String> = request
                .actions
                .iter()
                .map(|button| format!("[{}]", button.title))
                .collect();
            println!(
                "🔔 {} | {} {}",
                request.content.title,
                request.content.body,
                buttons.join(" ")
            );
            if request.repeating {
                let mut next = request;
                next.fire_at += chrono::Duration::days(1);
                pending.insert(next.id.clone(), next);
            }
        }
        registration.send(Input::AlarmFired(id.to_string()))
    }
}

impl Notifier for ConsoleNotifier {
    fn schedule(&mut self, request: &NotificationRequest) -> Result<(), CollaboratorError> {
        info!(
            id = %request.id,
            fire_at = %request.fire_at,
            repeating = request.repeating,
            "Notification scheduled"
        );
        lock(&self.pending).insert(request.id.clone(), request.clone());
        Ok(())
    }

    fn cancel(&mut self, id: &str) -> Result<(), CollaboratorError> {
        if lock(&self.pending).remove(id).is_some() {
            info!(id, "Notification cancelled");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct ConsoleRecorder {
    recording: bool,
}

impl Recorder for ConsoleRecorder {
    fn start(&mut self) -> Result<(), CollaboratorError> {
        self.recording = true;
        info!("Recording started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        if self.recording {
            self.recording = false;
            info!("Recording stopped");
        }
        Ok(())
    }
}

/// Forwards samples typed at the prompt while motion updates are on.
#[derive(Clone, Default)]
pub struct ConsoleMotionSensor {
    registration: Arc<Mutex<Option<Registration>>>,
    tracker: Arc<Mutex<AccelerationTracker>>,
}

impl ConsoleMotionSensor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a magnitude delta. Returns `false` when updates are off.
    pub fn push_delta(&self, magnitude_delta: f64) -> bool {
        let sample = MotionSample {
            magnitude_delta,
            at: Local::now().naive_local(),
        };
        self.push(sample)
    }

    /// Feed a raw acceleration reading.
    pub fn push_acceleration(&self, x: f64, y: f64, z: f64) -> bool {
        let sample = lock(&self.tracker).sample(x, y, z, Local::now().naive_local());
        self.push(sample)
    }

    fn push(&self, sample: MotionSample) -> bool {
        match lock(&self.registration).as_ref() {
            Some(registration) => registration.deliver(sample),
            None => false,
        }
    }
}

impl MotionSensor for ConsoleMotionSensor {
    fn start(&mut self, registration: Registration) -> Result<(), CollaboratorError> {
        *lock(&self.registration) = Some(registration);
        *lock(&self.tracker) = AccelerationTracker::new();
        debug!("Motion updates started");
        Ok(())
    }

    fn stop(&mut self) {
        if lock(&self.registration).take().is_some() {
            debug!("Motion updates stopped");
        }
    }
}
