//! Core error types for morningroutine-core.
//!
//! Policy rejections (snoozing past the budget, ticking while no exercise is
//! running) are not errors and never appear here. Collaborator failures are
//! reported through [`CollaboratorError`] and turned into events by the
//! runtime instead of being propagated.

use std::path::PathBuf;
use thiserror::Error;

use crate::collaborators::Collaborator;

/// Core error type for morningroutine-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A platform collaborator failed
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The routine service is no longer running
    #[error("Routine service has shut down")]
    ServiceClosed,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// The config directory could not be resolved
    #[error("Cannot resolve config directory")]
    NoConfigDir,
}

/// Failure reported by a platform collaborator.
///
/// Always non-fatal for the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The user has not granted the capability the collaborator needs
    #[error("{collaborator} is not authorized")]
    Unauthorized { collaborator: Collaborator },

    /// The underlying hardware or service is missing
    #[error("{collaborator} is unavailable: {message}")]
    Unavailable {
        collaborator: Collaborator,
        message: String,
    },

    /// The platform rejected the request
    #[error("{collaborator} request failed: {message}")]
    RequestFailed {
        collaborator: Collaborator,
        message: String,
    },
}

impl CollaboratorError {
    /// The collaborator that produced this error.
    pub fn collaborator(&self) -> Collaborator {
        match self {
            CollaboratorError::Unauthorized { collaborator }
            | CollaboratorError::Unavailable { collaborator, .. }
            | CollaboratorError::RequestFailed { collaborator, .. } => *collaborator,
        }
    }
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Wake time could not be parsed
    #[error("Invalid wake time '{input}': expected HH:MM")]
    InvalidWakeTime { input: String },

    /// Unknown notification action identifier
    #[error("Unknown notification action: {0}")]
    UnknownAction(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
