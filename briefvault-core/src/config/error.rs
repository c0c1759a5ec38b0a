//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk
    #[error("Cannot read config file: {0}")]
    Read(String),

    /// The config file could not be written
    #[error("Cannot write config file: {0}")]
    Write(String),

    /// The file contents are not valid toml for this schema
    #[error("Malformed config: {0}")]
    Parse(String),

    #[error("Cannot serialize config: {0}")]
    Serialize(String),

    /// An environment override did not parse
    #[error("Invalid config value: {0}")]
    InvalidValue(String),

    /// The assembled config violates a constraint
    #[error("Config validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ConfigError::Read("no such file".to_string());
        assert_eq!(err.to_string(), "Cannot read config file: no such file");

        let err = ConfigError::Validation("store name must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Config validation failed: store name must not be empty"
        );
    }
}
