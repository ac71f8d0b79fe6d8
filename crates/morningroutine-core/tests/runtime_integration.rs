//! Integration tests for the serialized routine runtime.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use morningroutine_core::{
    AlarmSchedule, Collaborator, CollaboratorError, Event, Input, MotionSensor, NotificationAction,
    NotificationRequest, Notifier, Recorder, Registration, RoutineService, RoutineSession,
    RoutineSettings, RoutineState,
};
use tokio::sync::broadcast;

/// Everything the fake collaborators were asked to do, in order.
type CallLog = Arc<Mutex<Vec<String>>>;

struct FakeNotifier {
    log: CallLog,
}

impl Notifier for FakeNotifier {
    fn schedule(&mut self, request: &NotificationRequest) -> Result<(), CollaboratorError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("schedule:{}:{}", request.id, request.repeating));
        Ok(())
    }

    fn cancel(&mut self, id: &str) -> Result<(), CollaboratorError> {
        self.log.lock().unwrap().push(format!("cancel:{id}"));
        Ok(())
    }
}

struct FakeRecorder {
    log: CallLog,
    authorized: bool,
}

impl Recorder for FakeRecorder {
    fn start(&mut self) -> Result<(), CollaboratorError> {
        if !self.authorized {
            return Err(CollaboratorError::Unauthorized {
                collaborator: Collaborator::Recorder,
            });
        }
        self.log.lock().unwrap().push("record:start".into());
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CollaboratorError> {
        self.log.lock().unwrap().push("record:stop".into());
        Ok(())
    }
}

#[derive(Default)]
struct FakeSensor {
    registration: Arc<Mutex<Option<Registration>>>,
}

impl MotionSensor for FakeSensor {
    fn start(&mut self, registration: Registration) -> Result<(), CollaboratorError> {
        *self.registration.lock().unwrap() = Some(registration);
        Ok(())
    }

    fn stop(&mut self) {
        self.registration.lock().unwrap().take();
    }
}

struct Harness {
    service: RoutineService,
    handle: morningroutine_core::RoutineHandle,
    log: CallLog,
    sensor_registration: Arc<Mutex<Option<Registration>>>,
}

fn harness(settings: RoutineSettings, camera_authorized: bool) -> Harness {
    let log: CallLog = Arc::default();
    let sensor = FakeSensor::default();
    let sensor_registration = sensor.registration.clone();
    let (service, handle) = RoutineService::new(
        RoutineSession::new(settings),
        Box::new(FakeNotifier { log: log.clone() }),
        Box::new(FakeRecorder {
            log: log.clone(),
            authorized: camera_authorized,
        }),
        Box::new(sensor),
    );
    Harness {
        service,
        handle,
        log,
        sensor_registration,
    }
}

async fn next_of_kind(events: &mut broadcast::Receiver<Event>, kind: &str) -> Event {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if event.kind() == kind {
            return event;
        }
    }
}

#[tokio::test]
async fn test_inputs_are_applied_in_order() {
    let Harness {
        service,
        handle,
        log,
        ..
    } = harness(RoutineSettings::default(), true);
    let task = tokio::spawn(service.run());

    handle
        .set_alarm(AlarmSchedule::parse("07:00", true).unwrap())
        .unwrap();
    handle.alarm_fired("morning_alarm").unwrap();
    handle.action(NotificationAction::Snooze).unwrap();
    handle.action(NotificationAction::Snooze).unwrap();
    handle.action(NotificationAction::Snooze).unwrap();
    handle.shutdown().unwrap();

    let session = task.await.unwrap();
    assert_eq!(session.state(), RoutineState::Snoozed);
    assert_eq!(session.remaining_snoozes(), 0);

    let log = log.lock().unwrap().clone();
    assert_eq!(
        log,
        vec![
            "cancel:morning_alarm",
            "cancel:snooze_alarm_1",
            "cancel:snooze_alarm_2",
            "schedule:morning_alarm:true",
            "schedule:snooze_alarm_1:false",
            "schedule:snooze_alarm_2:false",
        ]
    );
}

#[tokio::test]
async fn test_recorder_denial_is_non_fatal() {
    let Harness {
        service,
        handle,
        log,
        ..
    } = harness(RoutineSettings::default(), false);
    let mut events = handle.subscribe();
    let task = tokio::spawn(service.run());

    handle.start_exercise().unwrap();
    let failure = next_of_kind(&mut events, "collaborator_failed").await;
    assert!(matches!(
        failure,
        Event::CollaboratorFailed {
            collaborator: Collaborator::Recorder,
            ..
        }
    ));
    next_of_kind(&mut events, "permission_changed").await;

    handle.stop_exercise().unwrap();
    next_of_kind(&mut events, "exercise_stopped").await;
    handle.shutdown().unwrap();

    let session = task.await.unwrap();
    assert_eq!(session.state(), RoutineState::Idle);
    // Camera was marked denied, so no stop was sent for a recording that
    // never started.
    assert!(!log.lock().unwrap().iter().any(|c| c.starts_with("record:")));
}

#[tokio::test]
async fn test_completion_dismisses_after_grace_period() {
    let settings = RoutineSettings {
        exercise_duration: Duration::from_secs(2),
        dismiss_delay: Duration::from_millis(20),
        ..RoutineSettings::default()
    };
    let Harness {
        service,
        handle,
        log,
        ..
    } = harness(settings, true);
    let mut events = handle.subscribe();
    let task = tokio::spawn(service.run());

    handle.start_exercise().unwrap();
    handle.send(Input::Tick(Duration::from_secs(1))).unwrap();
    handle.send(Input::Tick(Duration::from_secs(1))).unwrap();
    next_of_kind(&mut events, "exercise_completed").await;
    let dismissed = next_of_kind(&mut events, "routine_dismissed").await;
    assert!(matches!(
        dismissed,
        Event::RoutineDismissed {
            state: RoutineState::Idle,
            ..
        }
    ));

    handle.shutdown().unwrap();
    task.await.unwrap();
    let log = log.lock().unwrap().clone();
    assert_eq!(
        log.iter().filter(|c| c.as_str() == "record:stop").count(),
        1
    );
}

#[tokio::test]
async fn test_restarted_exercise_keeps_its_own_grace_period() {
    let settings = RoutineSettings {
        exercise_duration: Duration::from_secs(1),
        dismiss_delay: Duration::from_millis(500),
        ..RoutineSettings::default()
    };
    let Harness { service, handle, .. } = harness(settings, true);
    let mut events = handle.subscribe();
    let task = tokio::spawn(service.run());

    handle.start_exercise().unwrap();
    handle.send(Input::Tick(Duration::from_secs(1))).unwrap();
    next_of_kind(&mut events, "exercise_completed").await;

    // Restart and finish again inside the first grace period.
    tokio::time::sleep(Duration::from_millis(250)).await;
    handle.start_exercise().unwrap();
    handle.send(Input::Tick(Duration::from_secs(1))).unwrap();
    next_of_kind(&mut events, "exercise_completed").await;

    // Past the first timer's deadline, before the second one's.
    tokio::time::sleep(Duration::from_millis(375)).await;
    handle.send(Input::Snapshot).unwrap();
    let snapshot = next_of_kind(&mut events, "state_snapshot").await;
    assert!(matches!(
        snapshot,
        Event::StateSnapshot {
            state: RoutineState::ExerciseComplete,
            ..
        }
    ));

    next_of_kind(&mut events, "routine_dismissed").await;
    handle.shutdown().unwrap();
    let session = task.await.unwrap();
    assert_eq!(session.state(), RoutineState::Idle);
}

#[tokio::test]
async fn test_sensor_registration_does_not_outlive_service() {
    let Harness {
        service,
        handle,
        sensor_registration,
        ..
    } = harness(RoutineSettings::default(), true);
    let mut events = handle.subscribe();
    let task = tokio::spawn(service.run());

    handle.start_exercise().unwrap();
    next_of_kind(&mut events, "exercise_started").await;
    let registration = sensor_registration
        .lock()
        .unwrap()
        .clone()
        .expect("sensor was started");
    assert!(registration.send(Input::Tick(Duration::from_secs(1))));

    drop(handle);
    let session = task.await.unwrap();
    assert_eq!(session.state(), RoutineState::ExerciseActive);
    assert!(!registration.send(Input::Tick(Duration::from_secs(1))));
}
