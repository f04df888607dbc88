//! Core error types for pompom-core.
//!
//! Commands that can be refused (only `start`) report through these types.
//! Pause and reset never fail; background loop problems are folded into
//! expiry rather than surfaced as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pompom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine was created outside a tokio runtime
    #[error("no tokio runtime available to drive the timer")]
    NoRuntime,
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

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be prepared
    #[error("Data directory unavailable: {0}")]
    DataDir(#[source] std::io::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Duration was not a positive whole number of minutes
    #[error("invalid duration '{input}': please enter a positive number of minutes")]
    InvalidDuration { input: String },
}

impl CoreError {
    /// True when the error is a rejected duration.
    pub fn is_invalid_duration(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(ValidationError::InvalidDuration { .. })
        )
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_duration_message_names_input() {
        let err: CoreError = ValidationError::InvalidDuration {
            input: "-5".into(),
        }
        .into();
        assert!(err.is_invalid_duration());
        assert!(err.to_string().contains("'-5'"));
    }

    #[test]
    fn config_error_is_not_invalid_duration() {
        let err: CoreError = ConfigError::UnknownKey("timer.nope".into()).into();
        assert!(!err.is_invalid_duration());
    }
}
