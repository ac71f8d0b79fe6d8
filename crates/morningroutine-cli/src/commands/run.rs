use clap::Args;
use morningroutine_core::{
    spawn_clock, AlarmSchedule, AuthorizationStatus, Capability, Config, Input, RoutineService,
    RoutineSession,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::console::{ConsoleMotionSensor, ConsoleNotifier, ConsoleRecorder};

#[derive(Args)]
pub struct RunArgs {
    /// Wake time (HH:MM). Falls back to alarm.default_wake_time
    #[arg(long)]
    pub alarm: Option<String>,
    /// Fire the alarm only once instead of daily
    #[arg(long)]
    pub once: bool,
    /// Override the exercise length in seconds
    #[arg(long)]
    pub exercise_secs: Option<u64>,
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq)]
enum PromptCommand {
    Alarm(String),
    Fire,
    Snooze,
    Exercise,
    Stop,
    Move(f64),
    Shake(f64, f64, f64),
    Permission(Capability, AuthorizationStatus),
    Status,
    Help,
    Quit,
}

const HELP: &str = "\
commands:
  alarm HH:MM            set the alarm
  fire                   deliver the next pending notification now
  snooze                 snooze the alarm
  exercise               start the exercise session
  stop                   stop the exercise session
  move <delta>           report a motion magnitude delta
  shake <x> <y> <z>      report a raw acceleration reading
  deny|allow <capability> change notifications/camera/motion permission
  status                 print a state snapshot
  quit";

fn parse_number(s: &str) -> Result<f64, String> {
    s.parse::<f64>().map_err(|_| format!("not a number: {s}"))
}

fn parse_prompt(line: &str) -> Result<PromptCommand, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err("empty command".into());
    };
    let args: Vec<&str> = words.collect();

    let command = match (head, args.as_slice()) {
        ("alarm", [time]) => PromptCommand::Alarm(time.to_string()),
        ("fire", []) => PromptCommand::Fire,
        ("snooze", []) => PromptCommand::Snooze,
        ("exercise" | "start", []) => PromptCommand::Exercise,
        ("stop", []) => PromptCommand::Stop,
        ("move", [delta]) => PromptCommand::Move(parse_number(delta)?),
        ("shake", [x, y, z]) => PromptCommand::Shake(parse_number(x)?, parse_number(y)?, parse_number(z)?),
        ("deny", [capability]) => {
            PromptCommand::Permission(capability.parse()?, AuthorizationStatus::Denied)
        }
        ("allow", [capability]) => {
            PromptCommand::Permission(capability.parse()?, AuthorizationStatus::Authorized)
        }
        ("status", []) => PromptCommand::Status,
        ("help" | "?", []) => PromptCommand::Help,
        ("quit" | "exit", []) => PromptCommand::Quit,
        _ => return Err(format!("unrecognized command: {line}")),
    };
    Ok(command)
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(secs) = args.exercise_secs {
        config.update("exercise.duration_secs", &secs.to_string())?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_interactive(args, config))
}

async fn run_interactive(args: RunArgs, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let repeats = config.alarm.repeats && !args.once;
    let initial_alarm = match args.alarm.as_deref() {
        Some(time) => Some(AlarmSchedule::parse(time, repeats)?),
        None => config.default_alarm(),
    };

    let notifier = ConsoleNotifier::new();
    let sensor = ConsoleMotionSensor::new();
    let (service, handle) = RoutineService::new(
        RoutineSession::new(config.routine_settings()),
        Box::new(notifier.clone()),
        Box::new(ConsoleRecorder::default()),
        Box::new(sensor.clone()),
    );

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("{json}"),
                    Err(e) => warn!(error = %e, "Failed to encode event"),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event printer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let service_task = tokio::spawn(service.run());
    let registration = handle.registration();
    let clock = spawn_clock(registration.clone(), config.tick_period());
    let delivery = notifier.spawn_delivery(registration.clone());

    if let Some(schedule) = initial_alarm {
        handle.set_alarm(schedule)?;
    }
    eprintln!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let command = match parse_prompt(line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{message} (type 'help')");
                continue;
            }
        };
        match command {
            PromptCommand::Alarm(time) => match AlarmSchedule::parse(&time, repeats) {
                Ok(schedule) => handle.set_alarm(schedule)?,
                Err(e) => eprintln!("{e}"),
            },
            PromptCommand::Fire => {
                if notifier.fire_next(&registration).is_none() {
                    eprintln!("no pending notifications");
                }
            }
            PromptCommand::Snooze => handle.snooze()?,
            PromptCommand::Exercise => handle.start_exercise()?,
            PromptCommand::Stop => handle.stop_exercise()?,
            PromptCommand::Move(delta) => {
                if !sensor.push_delta(delta) {
                    eprintln!("motion updates are off");
                }
            }
            PromptCommand::Shake(x, y, z) => {
                if !sensor.push_acceleration(x, y, z) {
                    eprintln!("motion updates are off");
                }
            }
            PromptCommand::Permission(capability, status) => {
                handle.send(Input::Permission(capability, status))?
            }
            PromptCommand::Status => handle.send(Input::Snapshot)?,
            PromptCommand::Help => eprintln!("{HELP}"),
            PromptCommand::Quit => break,
        }
    }

    handle.shutdown()?;
    service_task.await?;
    clock.abort();
    delivery.abort();
    drop(handle);
    printer.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prompt_commands() {
        assert_eq!(
            parse_prompt("alarm 07:00"),
            Ok(PromptCommand::Alarm("07:00".into()))
        );
        assert_eq!(parse_prompt("  snooze "), Ok(PromptCommand::Snooze));
        assert_eq!(parse_prompt("move 0.8"), Ok(PromptCommand::Move(0.8)));
        assert_eq!(
            parse_prompt("shake 0 0 1"),
            Ok(PromptCommand::Shake(0.0, 0.0, 1.0))
        );
        assert_eq!(
            parse_prompt("deny camera"),
            Ok(PromptCommand::Permission(
                Capability::Camera,
                AuthorizationStatus::Denied
            ))
        );
    }

    #[test]
    fn rejects_malformed_prompt_commands() {
        assert!(parse_prompt("").is_err());
        assert!(parse_prompt("move fast").is_err());
        assert!(parse_prompt("snooze twice").is_err());
        assert!(parse_prompt("deny microphone").is_err());
    }
}
