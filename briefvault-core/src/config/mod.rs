//! Configuration management for BriefVault
//!
//! This module provides environment-based configuration management with
//! support for defaults, file loading and validation.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Record store configuration
    pub store: StoreConfig,

    /// Sync engine configuration
    pub sync: SyncConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database name; the file becomes `<data_dir>/<name>.db`
    pub name: String,

    /// Target schema version for the migration runner
    pub version: i32,

    /// Data directory for persistent storage
    pub data_dir: PathBuf,

    /// Passphrase for at-rest payload encryption; `None` disables it
    pub encryption_key: Option<String>,
}

/// Sync engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between automatic sync passes
    #[serde(with = "humantime_serde")]
    pub sync_interval: Duration,

    /// Settle delay after a reconnect before the catch-up sync
    #[serde(with = "humantime_serde")]
    pub reconnect_settle: Duration,

    /// Upper bound on a single remote push
    #[serde(with = "humantime_serde")]
    pub push_timeout: Duration,

    /// Base delay for the per-item exponential backoff
    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,

    /// Failed attempts after which automatic passes leave an item
    /// to manual retry
    pub max_auto_attempts: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,

    /// Log file path (optional)
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "briefvault".to_string(),
            version: crate::store::migrations::CURRENT_SCHEMA_VERSION,
            data_dir: PathBuf::from("./data"),
            encryption_key: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(30),
            reconnect_settle: Duration::from_secs(1),
            push_timeout: Duration::from_secs(30),
            backoff_base: Duration::from_secs(5),
            max_auto_attempts: 8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: BRIEFVAULT_<SECTION>_<KEY>
    /// Example: BRIEFVAULT_STORE_DATA_DIR=/var/lib/briefvault
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Store config
        if let Ok(name) = env::var("BRIEFVAULT_STORE_NAME") {
            config.store.name = name;
        }
        if let Ok(version) = env::var("BRIEFVAULT_STORE_VERSION") {
            config.store.version = version
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid store version: {}", e)))?;
        }
        if let Ok(data_dir) = env::var("BRIEFVAULT_STORE_DATA_DIR") {
            config.store.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(key) = env::var("BRIEFVAULT_STORE_ENCRYPTION_KEY") {
            config.store.encryption_key = Some(key);
        }

        // Sync config
        if let Ok(interval) = env::var("BRIEFVAULT_SYNC_INTERVAL") {
            config.sync.sync_interval = parse_duration("sync interval", &interval)?;
        }
        if let Ok(settle) = env::var("BRIEFVAULT_SYNC_RECONNECT_SETTLE") {
            config.sync.reconnect_settle = parse_duration("reconnect settle", &settle)?;
        }
        if let Ok(timeout) = env::var("BRIEFVAULT_SYNC_PUSH_TIMEOUT") {
            config.sync.push_timeout = parse_duration("push timeout", &timeout)?;
        }
        if let Ok(attempts) = env::var("BRIEFVAULT_SYNC_MAX_AUTO_ATTEMPTS") {
            config.sync.max_auto_attempts = attempts.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid max auto attempts: {}", e))
            })?;
        }

        // Logging config
        if let Ok(level) = env::var("BRIEFVAULT_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(json) = env::var("BRIEFVAULT_LOG_JSON") {
            config.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate store config
        if self.store.name.is_empty() {
            return Err(ConfigError::Validation(
                "store name must not be empty".to_string(),
            ));
        }

        if self.store.version < 1 {
            return Err(ConfigError::Validation(
                "store version must be at least 1".to_string(),
            ));
        }

        if let Some(key) = &self.store.encryption_key {
            if key.is_empty() {
                return Err(ConfigError::Validation(
                    "encryption key must not be empty when set".to_string(),
                ));
            }
        }

        // Validate sync config
        if self.sync.sync_interval.is_zero() {
            return Err(ConfigError::Validation(
                "sync_interval must be greater than 0".to_string(),
            ));
        }

        if self.sync.push_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "push_timeout must be greater than 0".to_string(),
            ));
        }

        if self.sync.max_auto_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_auto_attempts must be greater than 0".to_string(),
            ));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::Write(e.to_string()))?;

        Ok(())
    }
}

fn parse_duration(what: &str, value: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(value)
        .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", what, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.store.name = String::new();
        assert!(config.validate().is_err());

        config = Config::default();
        config.store.encryption_key = Some(String::new());
        assert!(config.validate().is_err());

        config = Config::default();
        config.sync.sync_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config = Config::default();
        config.sync.max_auto_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let mut config = Config::default();

        config.logging.level = "invalid".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("briefvault.toml");

        let mut config = Config::default();
        config.store.name = "firm_vault".to_string();
        config.sync.sync_interval = Duration::from_secs(45);

        config.save_to_file(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();

        assert_eq!(loaded.store.name, "firm_vault");
        assert_eq!(loaded.sync.sync_interval, Duration::from_secs(45));
    }
}
