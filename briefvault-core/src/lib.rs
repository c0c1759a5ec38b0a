//! BriefVault core
//!
//! Offline-first record store with a background sync queue. Records are
//! persisted locally first (optionally encrypted at rest) and drained to
//! a pluggable remote through the sync engine whenever connectivity
//! allows. Hosts integrate through [`client::OfflineClient`].

pub mod client;
pub mod config;
pub mod connectivity;
pub mod logging;
pub mod metrics;
pub mod store;
pub mod sync;

pub use client::{OfflineClient, SyncSubscription};
pub use config::{Config, ConfigError};
pub use connectivity::{ConnectivityEvent, ConnectivityMonitor};
pub use logging::{init_logging, LogLevel};
pub use store::{
    OfflineRecord, RecordId, RecordStore, StorageStats, StoreError, StoreResult, SyncAction,
    SyncQueueItem, SyncStatus,
};
pub use sync::{PushError, RemotePush, SyncEngine, SyncReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Ensure the main exports are accessible
        let _ = LogLevel::Info;
        let _ = SyncStatus::Unsynced;
        let _ = Config::default();
    }
}
