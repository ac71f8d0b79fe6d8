//! Integration tests for the routine session state machine.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use morningroutine_core::routine::{Clock, ManualClock, ALARM_NOTIFICATION_ID};
use morningroutine_core::{
    AlarmSchedule, Command, Effects, Event, Input, MotionSample, NotificationAction, Rejection,
    RoutineSession, RoutineSettings, RoutineState,
};
use proptest::prelude::*;

fn wake_day() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(6, 55, 0)
        .unwrap()
}

fn new_session(settings: RoutineSettings) -> (RoutineSession, ManualClock) {
    let clock = ManualClock::new(wake_day());
    (RoutineSession::with_clock(settings, Box::new(clock.clone())), clock)
}

fn count_commands(all: &[Effects], wanted: &Command) -> usize {
    all.iter()
        .flat_map(|fx| fx.commands.iter())
        .filter(|c| *c == wanted)
        .count()
}

fn cancelled_ids(fx: &Effects) -> Vec<String> {
    fx.commands
        .iter()
        .filter_map(|c| match c {
            Command::CancelNotification { id } => Some(id.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_snooze_budget_scenario() {
    let (mut session, _clock) = new_session(RoutineSettings::default());
    session.set_alarm(AlarmSchedule::parse("07:00", true).unwrap());
    session.alarm_fired(ALARM_NOTIFICATION_ID);
    assert_eq!(session.state(), RoutineState::AlarmFiring);

    assert!(session.can_snooze());
    assert!(!session.snooze().is_rejected());
    session.alarm_fired("snooze_alarm_1");
    assert!(!session.snooze().is_rejected());
    assert!(!session.can_snooze());

    let third = session.snooze();
    assert_eq!(third.rejection, Some(Rejection::SnoozeBudgetExhausted));
    assert!(matches!(
        third.events.as_slice(),
        [Event::SnoozeRejected { count: 2, max: 2, .. }]
    ));
    assert_eq!(session.remaining_snoozes(), 0);
    assert_eq!(session.state(), RoutineState::Snoozed);
}

#[test]
fn test_full_exercise_issues_one_stop_recording() {
    let (mut session, clock) = new_session(RoutineSettings::default());
    let mut all = vec![session.start_exercise()];
    assert_eq!(
        session.exercise().unwrap().remaining(),
        Duration::from_secs(1200)
    );

    for _ in 0..1200 {
        clock.advance(Duration::from_secs(1));
        all.push(session.tick(Duration::from_secs(1)));
    }

    assert_eq!(session.state(), RoutineState::ExerciseComplete);
    assert_eq!(count_commands(&all, &Command::StartRecording), 1);
    assert_eq!(count_commands(&all, &Command::StopRecording), 1);
    let completions = all
        .iter()
        .flat_map(|fx| fx.events.iter())
        .filter(|e| matches!(e, Event::ExerciseCompleted { .. }))
        .count();
    assert_eq!(completions, 1);
}

#[test]
fn test_five_ticks_complete_once() {
    let settings = RoutineSettings {
        exercise_duration: Duration::from_secs(5),
        ..RoutineSettings::default()
    };
    let (mut session, _clock) = new_session(settings);
    session.start_exercise();

    let mut completions = 0;
    for _ in 0..7 {
        let fx = session.tick(Duration::from_secs(1));
        completions += fx
            .events
            .iter()
            .filter(|e| matches!(e, Event::ExerciseCompleted { .. }))
            .count();
    }
    assert_eq!(completions, 1);
}

#[test]
fn test_start_exercise_while_snoozed_cancels_slots() {
    let (mut session, _clock) = new_session(RoutineSettings::default());
    session.set_alarm(AlarmSchedule::parse("07:00", true).unwrap());
    session.snooze();
    session.snooze();
    assert_eq!(session.state(), RoutineState::Snoozed);
    assert_eq!(session.snooze_count(), 2);

    let fx = session.handle(Input::Action(NotificationAction::StartExercise));
    assert_eq!(session.snooze_count(), 0);
    assert_eq!(session.state(), RoutineState::ExerciseActive);
    assert_eq!(cancelled_ids(&fx), vec!["snooze_alarm_1", "snooze_alarm_2"]);
    assert!(fx.commands.contains(&Command::StartRecording));
    assert!(fx.commands.contains(&Command::StartMotionUpdates));
}

#[test]
fn test_set_alarm_resets_snoozes() {
    let (mut session, _clock) = new_session(RoutineSettings::default());
    session.set_alarm(AlarmSchedule::parse("07:00", true).unwrap());
    session.snooze();
    session.set_alarm(AlarmSchedule::parse("07:30", false).unwrap());
    assert_eq!(session.snooze_count(), 0);
    assert_eq!(session.schedule().unwrap().label(), "07:30");
    assert!(!session.schedule().unwrap().repeats);
}

#[test]
fn test_motion_keeps_warnings_away_until_window_closes() {
    let (mut session, clock) = new_session(RoutineSettings::default());
    session.start_exercise();
    session.handle(Input::MotionSample(MotionSample {
        magnitude_delta: 1.2,
        at: clock.now(),
    }));

    let mut warned_at = Vec::new();
    for second in 1..=5 {
        clock.advance(Duration::from_secs(1));
        let fx = session.tick(Duration::from_secs(1));
        if fx
            .events
            .iter()
            .any(|e| matches!(e, Event::ContinueExercising { .. }))
        {
            warned_at.push(second);
        }
    }
    // Latched for seconds 1 and 2; the window closes at 3.
    assert_eq!(warned_at, vec![3, 4, 5]);
    assert_eq!(session.state(), RoutineState::ExerciseActive);
}

#[derive(Debug, Clone)]
enum Op {
    SetAlarm,
    Snooze,
    StartExercise,
    StopExercise,
    Tick(u64),
    Fire,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::SetAlarm),
        Just(Op::Snooze),
        Just(Op::StartExercise),
        Just(Op::StopExercise),
        (1u64..400).prop_map(Op::Tick),
        Just(Op::Fire),
    ]
}

proptest! {
    #[test]
    fn snooze_count_never_exceeds_budget(ops in proptest::collection::vec(op_strategy(), 0..60)) {
        let (mut session, _clock) = new_session(RoutineSettings::default());
        for op in ops {
            let _effects = match op {
                Op::SetAlarm => {
                    let fx = session.set_alarm(AlarmSchedule::parse("07:00", true).unwrap());
                    prop_assert_eq!(session.snooze_count(), 0);
                    fx
                }
                Op::Snooze => {
                    let could = session.can_snooze();
                    let fx = session.snooze();
                    if !could {
                        prop_assert!(fx.is_rejected());
                        prop_assert!(fx.commands.is_empty());
                    }
                    fx
                }
                Op::StartExercise => {
                    let fx = session.start_exercise();
                    prop_assert_eq!(session.snooze_count(), 0);
                    fx
                }
                Op::StopExercise => session.stop_exercise(),
                Op::Tick(secs) => session.tick(Duration::from_secs(secs)),
                Op::Fire => session.alarm_fired(ALARM_NOTIFICATION_ID),
            };
            prop_assert!(session.snooze_count() <= 2);
            prop_assert_eq!(session.remaining_snoozes(), 2 - session.snooze_count());
        }
    }
}
