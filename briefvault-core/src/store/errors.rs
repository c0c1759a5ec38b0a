/*
    errors.rs - Error types for the store subsystem

    Defines all error types that can occur in:
    - Opening and migrating the database
    - Record CRUD
    - Payload encryption
    - Sync-status bookkeeping
*/

use thiserror::Error;

use super::model::SyncStatus;

/// Errors that can occur in the store subsystem
#[derive(Debug, Error)]
pub enum StoreError {
    /// The persistence backend cannot be opened; fatal for initialization
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Update/lookup on an id that does not exist
    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    /// Storage I/O error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Encryption failed
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key or corrupted ciphertext)
    #[error("Decryption error: {0}")]
    Decryption(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A sync-status transition outside the legal set
    #[error("Invalid sync-status transition: {from} -> {to}")]
    InvalidTransition { from: SyncStatus, to: SyncStatus },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(err: r2d2::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Internal(format!("Task join error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::RecordNotFound("abc".to_string());
        assert_eq!(err.to_string(), "Record 'abc' not found");

        let err = StoreError::StorageUnavailable("no such directory".to_string());
        assert_eq!(err.to_string(), "Storage unavailable: no such directory");
    }

    #[test]
    fn test_invalid_transition_display() {
        let err = StoreError::InvalidTransition {
            from: SyncStatus::Synced,
            to: SyncStatus::Failed,
        };
        assert!(err.to_string().contains("synced"));
        assert!(err.to_string().contains("failed"));
    }

    #[test]
    fn test_serde_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let store_err: StoreError = json_err.into();
        assert!(matches!(store_err, StoreError::Serialization(_)));
    }
}
