//! Database migrations for the offline record store
//!
//! Provides versioned migrations for the records/sync-queue schema.
//! Each migration is applied atomically and tracked in the
//! vault_schema_version table; the configured store version selects how
//! far forward to migrate.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::{SystemTime, UNIX_EPOCH};

use super::errors::{StoreError, StoreResult};

/// Current schema version for the record store
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial records and sync queue schema",
        up_sql: r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS vault_schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            );

            -- Offline records
            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                record_type TEXT NOT NULL,
                payload BLOB NOT NULL,              -- JSON, or ciphertext when encrypted
                encrypted INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                sync_status TEXT NOT NULL
                    CHECK(sync_status IN ('unsynced', 'syncing', 'synced', 'failed')),
                last_sync_attempt INTEGER,
                sync_retries INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_records_type ON records(record_type);
            CREATE INDEX IF NOT EXISTS idx_records_sync_status ON records(sync_status);
            CREATE INDEX IF NOT EXISTS idx_records_updated ON records(updated_at);

            -- Sync queue: one live entry per not-yet-synced record
            CREATE TABLE IF NOT EXISTS sync_queue (
                id TEXT PRIMARY KEY,
                record_id TEXT NOT NULL UNIQUE,
                record_type TEXT NOT NULL,
                action TEXT NOT NULL
                    CHECK(action IN ('create', 'update', 'delete')),
                payload BLOB NOT NULL,
                enqueued_at INTEGER NOT NULL,
                attempts INTEGER NOT NULL DEFAULT 0,
                last_error TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sync_queue_enqueued ON sync_queue(enqueued_at);
            CREATE INDEX IF NOT EXISTS idx_sync_queue_type ON sync_queue(record_type);
        "#,
    }]
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> StoreResult<i32> {
    let conn = pool.get()?;

    // Ensure schema_version table exists
    conn.execute(
        "CREATE TABLE IF NOT EXISTS vault_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM vault_schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations up to `target_version`
pub fn migrate(pool: &Pool<SqliteConnectionManager>, target_version: i32) -> StoreResult<()> {
    if target_version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::StorageUnavailable(format!(
            "Requested schema version {} is newer than this build supports ({})",
            target_version, CURRENT_SCHEMA_VERSION
        )));
    }

    let current_version = get_current_version(pool)?;
    let migrations = get_migrations();

    let pending_migrations: Vec<_> = migrations
        .into_iter()
        .filter(|m| m.version > current_version && m.version <= target_version)
        .collect();

    if pending_migrations.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;

    for migration in pending_migrations {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as i64;

        tx.execute(
            "INSERT INTO vault_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            "Applied migration: {}",
            migration.description
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_pool() -> Pool<SqliteConnectionManager> {
        let manager = SqliteConnectionManager::memory();
        // A single connection: each pooled in-memory connection would
        // otherwise see its own private database
        Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create pool")
    }

    #[test]
    fn test_initial_migration() {
        let pool = setup_test_pool();
        migrate(&pool, CURRENT_SCHEMA_VERSION).expect("Migration failed");

        let conn = pool.get().unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"records".to_string()));
        assert!(tables.contains(&"sync_queue".to_string()));
        assert!(tables.contains(&"vault_schema_version".to_string()));
    }

    #[test]
    fn test_migration_version_tracking() {
        let pool = setup_test_pool();
        migrate(&pool, CURRENT_SCHEMA_VERSION).expect("Migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_idempotent_migrations() {
        let pool = setup_test_pool();

        migrate(&pool, CURRENT_SCHEMA_VERSION).expect("First migration failed");
        migrate(&pool, CURRENT_SCHEMA_VERSION).expect("Second migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_future_version_rejected() {
        let pool = setup_test_pool();
        let result = migrate(&pool, CURRENT_SCHEMA_VERSION + 1);
        assert!(matches!(result, Err(StoreError::StorageUnavailable(_))));
    }

    #[test]
    fn test_record_id_unique_in_queue() {
        let pool = setup_test_pool();
        migrate(&pool, CURRENT_SCHEMA_VERSION).expect("Migration failed");

        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO sync_queue (id, record_id, record_type, action, payload, enqueued_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params!["q1", "r1", "payment", "create", b"{}".to_vec(), 1000i64],
        )
        .unwrap();

        // Second live entry for the same record violates the schema
        let dup = conn.execute(
            "INSERT INTO sync_queue (id, record_id, record_type, action, payload, enqueued_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params!["q2", "r1", "payment", "update", b"{}".to_vec(), 1001i64],
        );
        assert!(dup.is_err());
    }
}
