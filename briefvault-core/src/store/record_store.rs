//! SQLite-backed offline record store
//!
//! Durable keyed persistence for typed records plus the sync-queue ledger,
//! surviving process restarts. Payloads may be encrypted at rest; ids,
//! types and timestamps stay in clear so indexes keep working.
//!
//! Uses connection pooling for concurrent access and transactions for
//! atomicity; every public operation hops to the blocking pool so callers
//! never stall an async runtime thread.

use metrics::counter;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use std::sync::Arc;

use super::encryption::EncryptionManager;
use super::errors::{StoreError, StoreResult};
use super::migrations;
use super::model::{
    OfflineRecord, QueueItemId, RecordId, StorageStats, SyncAction, SyncQueueItem, SyncStatus,
    Timestamp,
};
use crate::config::StoreConfig;

/// SQLite-backed store for offline records and their sync queue
#[derive(Clone)]
pub struct RecordStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
    encryption: Option<Arc<EncryptionManager>>,
}

impl RecordStore {
    /// Open (or create) the store described by `config` and run pending
    /// migrations. Idempotent per database path.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        let config = config.clone();

        tokio::task::spawn_blocking(move || Self::open_blocking(&config)).await?
    }

    fn open_blocking(config: &StoreConfig) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            StoreError::StorageUnavailable(format!(
                "Cannot create data directory {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        let db_path = config.data_dir.join(format!("{}.db", config.name));
        let manager = SqliteConnectionManager::file(&db_path).with_init(|conn| {
            conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
        });

        let pool = Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| StoreError::StorageUnavailable(format!("Failed to open database: {}", e)))?;

        migrations::migrate(&pool, config.version)?;

        let encryption = match &config.encryption_key {
            Some(key) => Some(Arc::new(EncryptionManager::from_passphrase(key)?)),
            None => None,
        };

        tracing::info!(path = %db_path.display(), version = config.version, "Record store opened");

        Ok(Self {
            pool: Arc::new(pool),
            encryption,
        })
    }

    /// Whether payload encryption is configured
    pub fn encryption_enabled(&self) -> bool {
        self.encryption.is_some()
    }

    // ===== Record operations =====

    /// Persist a new record and its `create` queue entry atomically.
    /// Returns the generated id; never overwrites an existing one.
    pub async fn store(
        &self,
        record_type: &str,
        payload: serde_json::Value,
        encrypt: bool,
    ) -> StoreResult<RecordId> {
        let pool = self.pool.clone();
        let encryption = self.encryption.clone();
        let record_type = record_type.to_string();

        tokio::task::spawn_blocking(move || {
            let id = RecordId::generate();
            let now = Timestamp::now();

            let clear_bytes = serde_json::to_vec(&payload)?;
            // Encryption applies only when a key was configured at open time
            let (stored_bytes, is_encrypted) = match (&encryption, encrypt) {
                (Some(enc), true) => (enc.encrypt(&clear_bytes)?, true),
                _ => (clear_bytes.clone(), false),
            };

            let conn = pool.get()?;
            let tx = conn.unchecked_transaction()?;

            tx.execute(
                "INSERT INTO records
                 (id, record_type, payload, encrypted, created_at, updated_at, sync_status, sync_retries)
                 VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
                params![
                    id.as_str(),
                    &record_type,
                    &stored_bytes,
                    is_encrypted,
                    now.as_millis() as i64,
                    now.as_millis() as i64,
                    SyncStatus::Unsynced.as_str(),
                ],
            )?;

            // The queue snapshot is pushed to the remote side, so it stays clear
            tx.execute(
                "INSERT INTO sync_queue
                 (id, record_id, record_type, action, payload, enqueued_at, attempts)
                 VALUES (?, ?, ?, ?, ?, ?, 0)",
                params![
                    QueueItemId::generate().as_str(),
                    id.as_str(),
                    &record_type,
                    SyncAction::Create.as_str(),
                    &clear_bytes,
                    now.as_millis() as i64,
                ],
            )?;

            tx.commit()?;

            counter!("store.records.created").increment(1);
            tracing::debug!(record_id = %id, record_type = %record_type, "Record stored");
            Ok(id)
        })
        .await?
    }

    /// Fetch a record by id; `None` (not an error) when absent
    pub async fn get(&self, id: &RecordId) -> StoreResult<Option<OfflineRecord>> {
        let pool = self.pool.clone();
        let encryption = self.encryption.clone();
        let id = id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;

            let row = conn
                .query_row(
                    "SELECT id, record_type, payload, encrypted, created_at, updated_at,
                            sync_status, last_sync_attempt, sync_retries
                     FROM records WHERE id = ?",
                    params![id.as_str()],
                    row_to_raw_record,
                )
                .optional()?;

            match row {
                Some(raw) => Ok(Some(raw.into_record(encryption.as_deref())?)),
                None => Ok(None),
            }
        })
        .await?
    }

    /// Fetch all records of a type, ordered by creation time
    pub async fn get_all(&self, record_type: &str) -> StoreResult<Vec<OfflineRecord>> {
        let pool = self.pool.clone();
        let encryption = self.encryption.clone();
        let record_type = record_type.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;

            let mut stmt = conn.prepare(
                "SELECT id, record_type, payload, encrypted, created_at, updated_at,
                        sync_status, last_sync_attempt, sync_retries
                 FROM records WHERE record_type = ? ORDER BY created_at, id",
            )?;

            let raw_records = stmt
                .query_map(params![&record_type], row_to_raw_record)?
                .collect::<Result<Vec<_>, _>>()?;

            raw_records
                .into_iter()
                .map(|raw| raw.into_record(encryption.as_deref()))
                .collect()
        })
        .await?
    }

    /// Replace a record's payload, bump `updated_at`, reset it to unsynced
    /// and refresh its queue entry. Fails with `RecordNotFound` when the
    /// id does not exist.
    pub async fn update(&self, id: &RecordId, payload: serde_json::Value) -> StoreResult<()> {
        let pool = self.pool.clone();
        let encryption = self.encryption.clone();
        let id = id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let tx = conn.unchecked_transaction()?;

            let existing: Option<(String, bool)> = tx
                .query_row(
                    "SELECT record_type, encrypted FROM records WHERE id = ?",
                    params![id.as_str()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let (record_type, was_encrypted) = match existing {
                Some(found) => found,
                None => return Err(StoreError::RecordNotFound(id.to_string())),
            };

            let now = Timestamp::now();
            let clear_bytes = serde_json::to_vec(&payload)?;
            let stored_bytes = match (&encryption, was_encrypted) {
                (Some(enc), true) => enc.encrypt(&clear_bytes)?,
                _ => clear_bytes.clone(),
            };

            tx.execute(
                "UPDATE records SET payload = ?, updated_at = ?, sync_status = ? WHERE id = ?",
                params![
                    &stored_bytes,
                    now.as_millis() as i64,
                    SyncStatus::Unsynced.as_str(),
                    id.as_str(),
                ],
            )?;

            // One live queue entry per record: replace any pending entry.
            // A still-pending create keeps its action, the remote side has
            // never seen this record.
            let pending_action: Option<String> = tx
                .query_row(
                    "SELECT action FROM sync_queue WHERE record_id = ?",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let action = match pending_action.as_deref() {
                Some("create") => SyncAction::Create,
                _ => SyncAction::Update,
            };

            tx.execute(
                "DELETE FROM sync_queue WHERE record_id = ?",
                params![id.as_str()],
            )?;
            tx.execute(
                "INSERT INTO sync_queue
                 (id, record_id, record_type, action, payload, enqueued_at, attempts)
                 VALUES (?, ?, ?, ?, ?, ?, 0)",
                params![
                    QueueItemId::generate().as_str(),
                    id.as_str(),
                    &record_type,
                    action.as_str(),
                    &clear_bytes,
                    now.as_millis() as i64,
                ],
            )?;

            tx.commit()?;

            tracing::debug!(record_id = %id, action = %action, "Record updated");
            Ok(())
        })
        .await?
    }

    /// Hard-delete a record and any queue entry. No-op when already absent,
    /// so cleanup stays idempotent.
    pub async fn delete(&self, id: &RecordId) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let tx = conn.unchecked_transaction()?;

            let removed =
                tx.execute("DELETE FROM records WHERE id = ?", params![id.as_str()])?;
            tx.execute(
                "DELETE FROM sync_queue WHERE record_id = ?",
                params![id.as_str()],
            )?;

            tx.commit()?;

            if removed > 0 {
                counter!("store.records.deleted").increment(1);
            }
            Ok(())
        })
        .await?
    }

    /// Destructive wipe of records and queue, for logout/reset flows
    pub async fn clear_all(&self) -> StoreResult<()> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let tx = conn.unchecked_transaction()?;

            tx.execute("DELETE FROM records", [])?;
            tx.execute("DELETE FROM sync_queue", [])?;

            tx.commit()?;

            tracing::warn!("Record store cleared");
            Ok(())
        })
        .await?
    }

    /// Aggregate statistics, computed from the live tables in one
    /// connection so the published report never drifts from ground truth
    pub async fn storage_stats(&self) -> StoreResult<StorageStats> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;

            let mut stats = StorageStats::default();

            let mut stmt =
                conn.prepare("SELECT record_type, COUNT(*) FROM records GROUP BY record_type")?;
            let counts = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for (record_type, count) in counts {
                stats.total_records += count as usize;
                stats.records_by_type.insert(record_type, count as usize);
            }

            stats.pending_sync_items = conn.query_row(
                "SELECT COUNT(*) FROM sync_queue q
                 JOIN records r ON r.id = q.record_id
                 WHERE r.sync_status IN ('unsynced', 'syncing')",
                [],
                |row| row.get::<_, i64>(0),
            )? as usize;

            stats.failed_sync_items = conn.query_row(
                "SELECT COUNT(*) FROM sync_queue q
                 JOIN records r ON r.id = q.record_id
                 WHERE r.sync_status = 'failed'",
                [],
                |row| row.get::<_, i64>(0),
            )? as usize;

            Ok(stats)
        })
        .await?
    }

    // ===== Sync queue operations (engine-facing) =====

    /// Snapshot of the full queue in insertion order
    pub async fn sync_queue(&self) -> StoreResult<Vec<SyncQueueItem>> {
        self.queue_where(None).await
    }

    /// Queue entries whose record is currently failed
    pub async fn failed_queue_items(&self) -> StoreResult<Vec<SyncQueueItem>> {
        self.queue_where(Some(SyncStatus::Failed)).await
    }

    async fn queue_where(&self, status: Option<SyncStatus>) -> StoreResult<Vec<SyncQueueItem>> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;

            let base = "SELECT q.id, q.record_id, q.record_type, q.action, q.payload,
                               q.enqueued_at, q.attempts, q.last_error, r.last_sync_attempt
                        FROM sync_queue q
                        LEFT JOIN records r ON r.id = q.record_id";

            let items = match status {
                Some(status) => {
                    let sql = format!(
                        "{} WHERE r.sync_status = ? ORDER BY q.enqueued_at, q.id",
                        base
                    );
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map(params![status.as_str()], row_to_queue_item)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let sql = format!("{} ORDER BY q.enqueued_at, q.id", base);
                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map([], row_to_queue_item)?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                }
            };

            Ok(items)
        })
        .await?
    }

    /// Remove a queue entry after a confirmed remote success
    pub async fn remove_queue_item(&self, id: &QueueItemId) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.execute("DELETE FROM sync_queue WHERE id = ?", params![id.as_str()])?;
            Ok(())
        })
        .await?
    }

    /// Record a failed push attempt against a queue entry
    pub async fn mark_item_attempt(
        &self,
        id: &QueueItemId,
        error: Option<String>,
    ) -> StoreResult<()> {
        let pool = self.pool.clone();
        let id = id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.execute(
                "UPDATE sync_queue SET attempts = attempts + 1, last_error = ? WHERE id = ?",
                params![error, id.as_str()],
            )?;
            Ok(())
        })
        .await?
    }

    /// Transition a record's sync status, enforcing the legal set.
    /// `Failed` bumps the retry counter; `Synced` resets it.
    pub async fn set_sync_status(&self, record_id: &RecordId, next: SyncStatus) -> StoreResult<()> {
        let pool = self.pool.clone();
        let record_id = record_id.clone();

        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let tx = conn.unchecked_transaction()?;

            let current: Option<String> = tx
                .query_row(
                    "SELECT sync_status FROM records WHERE id = ?",
                    params![record_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let current = match current.as_deref().and_then(SyncStatus::from_str) {
                Some(status) => status,
                None => return Err(StoreError::RecordNotFound(record_id.to_string())),
            };

            if !current.can_transition_to(next) {
                return Err(StoreError::InvalidTransition {
                    from: current,
                    to: next,
                });
            }

            let now = Timestamp::now().as_millis() as i64;
            match next {
                SyncStatus::Failed => {
                    tx.execute(
                        "UPDATE records SET sync_status = ?, last_sync_attempt = ?,
                         sync_retries = sync_retries + 1 WHERE id = ?",
                        params![next.as_str(), now, record_id.as_str()],
                    )?;
                }
                SyncStatus::Synced => {
                    tx.execute(
                        "UPDATE records SET sync_status = ?, last_sync_attempt = ?,
                         sync_retries = 0 WHERE id = ?",
                        params![next.as_str(), now, record_id.as_str()],
                    )?;
                }
                _ => {
                    tx.execute(
                        "UPDATE records SET sync_status = ? WHERE id = ?",
                        params![next.as_str(), record_id.as_str()],
                    )?;
                }
            }

            tx.commit()?;
            Ok(())
        })
        .await?
    }
}

/// Record as read from SQLite, payload still possibly encrypted
struct RawRecord {
    id: String,
    record_type: String,
    payload: Vec<u8>,
    encrypted: bool,
    created_at: i64,
    updated_at: i64,
    sync_status: String,
    last_sync_attempt: Option<i64>,
    sync_retries: i64,
}

impl RawRecord {
    fn into_record(self, encryption: Option<&EncryptionManager>) -> StoreResult<OfflineRecord> {
        let clear_bytes = if self.encrypted {
            match encryption {
                Some(enc) => enc.decrypt(&self.payload)?,
                None => {
                    return Err(StoreError::Decryption(
                        "Record is encrypted but no key is configured".to_string(),
                    ))
                }
            }
        } else {
            self.payload
        };

        let payload: serde_json::Value = serde_json::from_slice(&clear_bytes)?;

        let sync_status = SyncStatus::from_str(&self.sync_status).ok_or_else(|| {
            StoreError::Storage(format!("Corrupted sync status: {}", self.sync_status))
        })?;

        Ok(OfflineRecord {
            id: RecordId::new(self.id),
            record_type: self.record_type,
            payload,
            encrypted: self.encrypted,
            created_at: Timestamp::from_millis(self.created_at.max(0) as u64),
            updated_at: Timestamp::from_millis(self.updated_at.max(0) as u64),
            sync_status,
            last_sync_attempt: self
                .last_sync_attempt
                .map(|ms| Timestamp::from_millis(ms.max(0) as u64)),
            sync_retries: self.sync_retries.max(0) as u32,
        })
    }
}

fn row_to_raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok(RawRecord {
        id: row.get(0)?,
        record_type: row.get(1)?,
        payload: row.get(2)?,
        encrypted: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        sync_status: row.get(6)?,
        last_sync_attempt: row.get(7)?,
        sync_retries: row.get(8)?,
    })
}

fn row_to_queue_item(row: &Row<'_>) -> rusqlite::Result<SyncQueueItem> {
    let payload_bytes: Vec<u8> = row.get(4)?;
    let payload = serde_json::from_slice(&payload_bytes).unwrap_or(serde_json::Value::Null);

    let action_str: String = row.get(3)?;
    let action = SyncAction::from_str(&action_str).unwrap_or(SyncAction::Create);

    Ok(SyncQueueItem {
        id: QueueItemId::new(row.get(0)?),
        record_id: RecordId::new(row.get(1)?),
        record_type: row.get(2)?,
        action,
        payload,
        enqueued_at: Timestamp::from_millis(row.get::<_, i64>(5)?.max(0) as u64),
        attempts: row.get::<_, i64>(6)?.max(0) as u32,
        last_attempt_at: row
            .get::<_, Option<i64>>(8)?
            .map(|ms| Timestamp::from_millis(ms.max(0) as u64)),
        last_error: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    async fn open_store(dir: &std::path::Path, key: Option<&str>) -> RecordStore {
        let config = StoreConfig {
            name: "test_vault".to_string(),
            version: migrations::CURRENT_SCHEMA_VERSION,
            data_dir: dir.to_path_buf(),
            encryption_key: key.map(|k| k.to_string()),
        };
        RecordStore::open(&config).await.expect("open failed")
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let id = store
            .store("disbursement", json!({"amount": 100}), false)
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap().expect("record missing");
        assert_eq!(record.record_type, "disbursement");
        assert_eq!(record.payload, json!({"amount": 100}));
        assert_eq!(record.sync_status, SyncStatus::Unsynced);
        assert_eq!(record.sync_retries, 0);
        assert!(!record.encrypted);
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let missing = store.get(&RecordId::generate()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_encrypted_round_trip() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), Some("practice-key")).await;

        let id = store
            .store("payment", json!({"amount": 250, "matter": "M-17"}), true)
            .await
            .unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert!(record.encrypted);
        assert_eq!(record.payload, json!({"amount": 250, "matter": "M-17"}));
    }

    #[tokio::test]
    async fn test_encrypted_survives_reopen() {
        let dir = tempdir().unwrap();
        let id = {
            let store = open_store(dir.path(), Some("practice-key")).await;
            store
                .store("payment", json!({"amount": 1}), true)
                .await
                .unwrap()
        };

        let store = open_store(dir.path(), Some("practice-key")).await;
        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.payload, json!({"amount": 1}));
    }

    #[tokio::test]
    async fn test_store_enqueues_create() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let id = store
            .store("receipt", json!({"amount": 5}), false)
            .await
            .unwrap();

        let queue = store.sync_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].record_id, id);
        assert_eq!(queue[0].action, SyncAction::Create);
        assert_ne!(queue[0].id.as_str(), id.as_str());
        assert_eq!(queue[0].last_attempt_at, None);
    }

    #[tokio::test]
    async fn test_queue_item_carries_last_attempt_time() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let id = store.store("payment", json!({}), false).await.unwrap();
        store.set_sync_status(&id, SyncStatus::Syncing).await.unwrap();
        store.set_sync_status(&id, SyncStatus::Failed).await.unwrap();

        let queue = store.sync_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        // Mirrors the record's last_sync_attempt stamp
        assert!(queue[0].last_attempt_at.is_some());
        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(queue[0].last_attempt_at, record.last_sync_attempt);
    }

    #[tokio::test]
    async fn test_update_missing_record_fails() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let result = store.update(&RecordId::generate(), json!({})).await;
        assert!(matches!(result, Err(StoreError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_single_queue_entry() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let id = store
            .store("receipt", json!({"amount": 5}), false)
            .await
            .unwrap();
        store.update(&id, json!({"amount": 6})).await.unwrap();
        store.update(&id, json!({"amount": 7})).await.unwrap();

        let queue = store.sync_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        // Record never reached the remote, so the action stays create
        assert_eq!(queue[0].action, SyncAction::Create);
        assert_eq!(queue[0].payload, json!({"amount": 7}));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let id = store.store("matter", json!({}), false).await.unwrap();

        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap(); // second call must not error

        assert!(store.get(&id).await.unwrap().is_none());
        assert!(store.sync_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_storage_stats() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        store.store("payment", json!({"a": 1}), false).await.unwrap();
        store.store("payment", json!({"a": 2}), false).await.unwrap();
        let failed_id = store.store("receipt", json!({"a": 3}), false).await.unwrap();

        store
            .set_sync_status(&failed_id, SyncStatus::Syncing)
            .await
            .unwrap();
        store
            .set_sync_status(&failed_id, SyncStatus::Failed)
            .await
            .unwrap();

        let stats = store.storage_stats().await.unwrap();
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.records_by_type.get("payment"), Some(&2));
        assert_eq!(stats.records_by_type.get("receipt"), Some(&1));
        assert_eq!(stats.pending_sync_items, 2);
        assert_eq!(stats.failed_sync_items, 1);
    }

    #[tokio::test]
    async fn test_illegal_transition_rejected() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let id = store.store("payment", json!({}), false).await.unwrap();

        // unsynced -> synced skips syncing
        let result = store.set_sync_status(&id, SyncStatus::Synced).await;
        assert!(matches!(
            result,
            Err(StoreError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_bumps_retry_counter() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        let id = store.store("payment", json!({}), false).await.unwrap();
        store.set_sync_status(&id, SyncStatus::Syncing).await.unwrap();
        store.set_sync_status(&id, SyncStatus::Failed).await.unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.sync_retries, 1);
        assert!(record.last_sync_attempt.is_some());

        store.set_sync_status(&id, SyncStatus::Syncing).await.unwrap();
        store.set_sync_status(&id, SyncStatus::Synced).await.unwrap();

        let record = store.get(&id).await.unwrap().unwrap();
        assert_eq!(record.sync_retries, 0);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path(), None).await;

        store.store("payment", json!({}), false).await.unwrap();
        store.store("receipt", json!({}), false).await.unwrap();

        store.clear_all().await.unwrap();

        let stats = store.storage_stats().await.unwrap();
        assert_eq!(stats.total_records, 0);
        assert!(store.sync_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_bad_directory_is_storage_unavailable() {
        let dir = tempdir().unwrap();
        // A file where the data directory should be
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        let config = StoreConfig {
            name: "vault".to_string(),
            version: migrations::CURRENT_SCHEMA_VERSION,
            data_dir: blocker,
            encryption_key: None,
        };

        let result = RecordStore::open(&config).await;
        assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
    }
}
