//! TOML-based application configuration.
//!
//! Stores the routine tunables:
//! - Snooze budget and interval
//! - Exercise length, tick period and dismiss grace period
//! - Motion threshold and latch window
//! - Alarm defaults and notification content
//!
//! Configuration is stored at `~/.config/morningroutine/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::routine::{parse_wake_time, AlarmSchedule, NotificationContent, RoutineSettings};

/// Upper bound for `snooze.max_snoozes`.
const MAX_SNOOZES: u64 = 10;

const SECS_PER_DAY: u64 = 86_400;

/// Snooze configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnoozeConfig {
    #[serde(default = "default_max_snoozes")]
    pub max_snoozes: u32,
    #[serde(default = "default_snooze_interval_secs")]
    pub interval_secs: u64,
}

/// Exercise configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseConfig {
    #[serde(default = "default_exercise_duration_secs")]
    pub duration_secs: u64,
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_dismiss_delay_secs")]
    pub dismiss_delay_secs: u64,
}

/// Motion detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionConfig {
    /// Minimum acceleration magnitude change that counts as movement.
    #[serde(default = "default_motion_threshold")]
    pub threshold: f64,
    #[serde(default = "default_motion_window_secs")]
    pub window_secs: u64,
    /// Accelerometer polling interval requested from the sensor.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

/// Alarm defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Alarms recur daily at the wake time.
    #[serde(default = "default_true")]
    pub repeats: bool,
    /// `HH:MM` used when no time is given on the command line.
    #[serde(default)]
    pub default_wake_time: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/morningroutine/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub snooze: SnoozeConfig,
    #[serde(default)]
    pub exercise: ExerciseConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    #[serde(default)]
    pub notification: NotificationContent,
}

// Default functions
fn default_max_snoozes() -> u32 {
    2
}
fn default_snooze_interval_secs() -> u64 {
    120
}
fn default_exercise_duration_secs() -> u64 {
    20 * 60
}
fn default_tick_secs() -> u64 {
    1
}
fn default_dismiss_delay_secs() -> u64 {
    2
}
fn default_motion_threshold() -> f64 {
    0.5
}
fn default_motion_window_secs() -> u64 {
    3
}
fn default_sample_interval_ms() -> u64 {
    100
}
fn default_true() -> bool {
    true
}

impl Default for SnoozeConfig {
    fn default() -> Self {
        Self {
            max_snoozes: default_max_snoozes(),
            interval_secs: default_snooze_interval_secs(),
        }
    }
}

impl Default for ExerciseConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_exercise_duration_secs(),
            tick_secs: default_tick_secs(),
            dismiss_delay_secs: default_dismiss_delay_secs(),
        }
    }
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            threshold: default_motion_threshold(),
            window_secs: default_motion_window_secs(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            repeats: true,
            default_wake_time: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            snooze: SnoozeConfig::default(),
            exercise: ExerciseConfig::default(),
            motion: MotionConfig::default(),
            alarm: AlarmConfig::default(),
            notification: NotificationContent::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing the defaults there if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change a value in memory. The result is validated before it replaces
    /// the current config.
    pub fn update(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and persist. Returns error if key is unknown.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.update(key, value)?;
        self.save()
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };

        let in_range = |key: &str, value: u64, min: u64, max: u64| {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(invalid(key, &format!("must be between {min} and {max}")))
            }
        };

        in_range("snooze.max_snoozes", u64::from(self.snooze.max_snoozes), 0, MAX_SNOOZES)?;
        in_range("snooze.interval_secs", self.snooze.interval_secs, 1, SECS_PER_DAY)?;
        in_range("exercise.duration_secs", self.exercise.duration_secs, 1, SECS_PER_DAY)?;
        in_range("exercise.tick_secs", self.exercise.tick_secs, 1, 60)?;
        in_range("exercise.dismiss_delay_secs", self.exercise.dismiss_delay_secs, 0, 60)?;
        in_range("motion.window_secs", self.motion.window_secs, 1, 60)?;
        in_range("motion.sample_interval_ms", self.motion.sample_interval_ms, 1, 10_000)?;
        if !self.motion.threshold.is_finite() || self.motion.threshold < 0.0 {
            return Err(invalid("motion.threshold", "must be a non-negative number"));
        }
        if let Some(wake_time) = &self.alarm.default_wake_time {
            parse_wake_time(wake_time)
                .map_err(|e| invalid("alarm.default_wake_time", &e.to_string()))?;
        }
        Ok(())
    }

    /// Session tunables derived from this config.
    pub fn routine_settings(&self) -> RoutineSettings {
        RoutineSettings {
            max_snoozes: self.snooze.max_snoozes,
            snooze_interval: Duration::from_secs(self.snooze.interval_secs),
            exercise_duration: Duration::from_secs(self.exercise.duration_secs),
            dismiss_delay: Duration::from_secs(self.exercise.dismiss_delay_secs),
            motion_threshold: self.motion.threshold,
            motion_window: Duration::from_secs(self.motion.window_secs),
            notification: self.notification.clone(),
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.exercise.tick_secs)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.motion.sample_interval_ms)
    }

    /// Alarm from `default_wake_time`, if configured.
    pub fn default_alarm(&self) -> Option<AlarmSchedule> {
        let wake_time = self.alarm.default_wake_time.as_deref()?;
        AlarmSchedule::parse(wake_time, self.alarm.repeats).ok()
    }
}
