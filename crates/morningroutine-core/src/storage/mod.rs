//! On-disk configuration. Session state itself is never persisted.

mod config;

pub use config::{AlarmConfig, Config, ExerciseConfig, MotionConfig, SnoozeConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/morningroutine[-dev]/` based on MORNINGROUTINE_ENV.
///
/// Set MORNINGROUTINE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .ok_or(ConfigError::NoConfigDir)?
        .join(".config");

    let env = std::env::var("MORNINGROUTINE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("morningroutine-dev")
    } else {
        base_dir.join("morningroutine")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
