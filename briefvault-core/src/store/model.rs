/*
    model.rs - Common types for offline records and the sync queue

    Defines:
    - Timestamps
    - IDs for records and queue entries
    - Record / queue-item structs and their status enums
    - Derived storage statistics
*/

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix timestamp in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Create a timestamp representing the current time
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards");
        Timestamp(duration.as_millis() as u64)
    }

    /// Create a timestamp from milliseconds since epoch
    pub fn from_millis(millis: u64) -> Self {
        Timestamp(millis)
    }

    /// Get milliseconds since epoch
    pub fn as_millis(&self) -> u64 {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an offline record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn new(id: String) -> Self {
        RecordId(id)
    }

    pub fn generate() -> Self {
        use uuid::Uuid;
        let id = Uuid::new_v4().to_string();
        RecordId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a sync-queue entry (distinct from the record id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItemId(pub String);

impl QueueItemId {
    pub fn new(id: String) -> Self {
        QueueItemId(id)
    }

    pub fn generate() -> Self {
        use uuid::Uuid;
        let id = Uuid::new_v4().to_string();
        QueueItemId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Propagation state of a record / queue entry.
///
/// Legal transitions: `Unsynced -> Syncing`, `Failed -> Syncing`,
/// `Syncing -> Synced`, `Syncing -> Failed`. Everything else is rejected
/// by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Unsynced,
    Syncing,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Unsynced => "unsynced",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "unsynced" => Some(SyncStatus::Unsynced),
            "syncing" => Some(SyncStatus::Syncing),
            "synced" => Some(SyncStatus::Synced),
            "failed" => Some(SyncStatus::Failed),
            _ => None,
        }
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        matches!(
            (self, next),
            (SyncStatus::Unsynced, SyncStatus::Syncing)
                | (SyncStatus::Failed, SyncStatus::Syncing)
                | (SyncStatus::Syncing, SyncStatus::Synced)
                | (SyncStatus::Syncing, SyncStatus::Failed)
        )
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The mutation the remote side must apply for a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(SyncAction::Create),
            "update" => Some(SyncAction::Update),
            "delete" => Some(SyncAction::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A locally persisted record awaiting (or done with) remote propagation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineRecord {
    /// Stable identifier, assigned at creation
    pub id: RecordId,

    /// Caller-defined category ("disbursement", "payment", ...)
    pub record_type: String,

    /// Domain data; always returned decrypted
    pub payload: serde_json::Value,

    /// Whether the payload is encrypted at rest
    pub encrypted: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    /// Engine-owned after creation
    pub sync_status: SyncStatus,

    /// Stamped by the engine on every attempt outcome
    pub last_sync_attempt: Option<Timestamp>,

    /// Failed attempts since the last successful sync
    pub sync_retries: u32,
}

/// One pending mutation in the sync queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncQueueItem {
    pub id: QueueItemId,
    pub record_id: RecordId,
    pub record_type: String,
    pub action: SyncAction,

    /// Payload snapshot to push; `Null` for deletes
    pub payload: serde_json::Value,

    pub enqueued_at: Timestamp,

    /// Push attempts so far
    pub attempts: u32,

    /// When the record was last pushed (mirrors the record row);
    /// `None` until the first attempt
    pub last_attempt_at: Option<Timestamp>,

    /// Error string from the most recent failed attempt
    pub last_error: Option<String>,
}

/// Aggregate statistics, derived on demand from the live tables
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageStats {
    pub total_records: usize,
    pub records_by_type: HashMap<String, usize>,
    /// Queue entries not yet failed (unsynced/syncing records)
    pub pending_sync_items: usize,
    /// Queue entries whose record is in the failed state
    pub failed_sync_items: usize,
}
