//! Error types for the logging subsystem

use thiserror::Error;

/// Errors that can occur when setting up logging
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    /// A subscriber is already installed, or the registry refused ours
    #[error("Failed to initialize logging: {0}")]
    Init(String),

    /// The configured level string is not a known level
    #[error("Unknown log level: {0}")]
    InvalidLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = LoggingError::Init("already set".to_string());
        assert_eq!(err.to_string(), "Failed to initialize logging: already set");

        let err = LoggingError::InvalidLevel("verbose".to_string());
        assert_eq!(err.to_string(), "Unknown log level: verbose");
    }

    #[test]
    fn test_is_std_error() {
        let err = LoggingError::Init("x".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
