/*
    Offline record store

    Durable keyed persistence for typed records plus the sync-queue
    ledger. SQLite-backed, optionally encrypting payloads at rest.
*/

pub mod encryption;
pub mod errors;
pub mod migrations;
pub mod model;
pub mod record_store;

pub use encryption::EncryptionManager;
pub use errors::{StoreError, StoreResult};
pub use model::{
    OfflineRecord, QueueItemId, RecordId, StorageStats, SyncAction, SyncQueueItem, SyncStatus,
    Timestamp,
};
pub use record_store::RecordStore;
