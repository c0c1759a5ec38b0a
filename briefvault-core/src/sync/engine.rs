//! Sync engine
//!
//! Drains the sync queue against the configured `RemotePush`, strictly
//! one pass at a time. Items are processed sequentially in queue order;
//! a failure marks the item and moves on, it never aborts the pass.
//!
//! Scheduled (timer-driven) passes honor a capped exponential backoff
//! per item so a dead remote is not hammered every tick. Explicit syncs
//! ignore the backoff: the operator asked, so we try.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::metrics::Timer;
use crate::store::{RecordStore, StoreError, StoreResult, SyncQueueItem, SyncStatus, Timestamp};

use super::push::RemotePush;

/// What a sync pass did. `ran == false` means the pass was declined
/// (offline, or another pass already in flight) and nothing was touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub ran: bool,
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SyncReport {
    fn declined() -> Self {
        SyncReport::default()
    }

    /// True when no item failed (trivially true for a declined pass)
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Which items a pass considers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassKind {
    /// Explicit request: whole queue, no backoff
    Manual,
    /// Timer tick: whole queue minus backed-off and attempt-capped items
    Scheduled,
    /// Explicit retry: failed items only, no backoff
    RetryFailed,
}

/// Drains pending mutations to the remote side
pub struct SyncEngine {
    store: RecordStore,
    remote: Arc<dyn RemotePush>,
    monitor: Arc<ConnectivityMonitor>,
    config: SyncConfig,
    // Claimed with try_lock: a pass that finds it held simply declines
    pass_guard: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        store: RecordStore,
        remote: Arc<dyn RemotePush>,
        monitor: Arc<ConnectivityMonitor>,
        config: SyncConfig,
    ) -> Self {
        SyncEngine {
            store,
            remote,
            monitor,
            config,
            pass_guard: Mutex::new(()),
        }
    }

    /// Explicitly requested sync over the whole queue
    pub async fn sync_pending(&self) -> StoreResult<SyncReport> {
        self.run_pass(PassKind::Manual).await
    }

    /// Timer-driven sync; respects per-item backoff and the attempt cap
    pub async fn sync_scheduled(&self) -> StoreResult<SyncReport> {
        self.run_pass(PassKind::Scheduled).await
    }

    /// Reprocess only items whose record is in the failed state
    pub async fn retry_failed(&self) -> StoreResult<SyncReport> {
        self.run_pass(PassKind::RetryFailed).await
    }

    async fn run_pass(&self, kind: PassKind) -> StoreResult<SyncReport> {
        if !self.monitor.is_online() {
            tracing::debug!(?kind, "Sync pass declined: offline");
            return Ok(SyncReport::declined());
        }

        // One pass at a time; concurrent callers back off instead of queuing
        let _guard = match self.pass_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!(?kind, "Sync pass declined: already in progress");
                return Ok(SyncReport::declined());
            }
        };

        let timer = Timer::new("sync.pass.duration_ms");
        counter!("sync.passes.total").increment(1);

        let snapshot = match kind {
            PassKind::RetryFailed => self.store.failed_queue_items().await?,
            _ => self.store.sync_queue().await?,
        };

        let mut report = SyncReport {
            ran: true,
            ..SyncReport::default()
        };

        let now = Timestamp::now();
        for item in snapshot {
            if kind == PassKind::Scheduled && !self.eligible_for_auto(&item, now) {
                report.skipped += 1;
                continue;
            }

            // attempted counts items that actually reached the remote
            match self.process_item(&item).await? {
                ItemOutcome::Synced => {
                    report.synced += 1;
                    report.attempted += 1;
                }
                ItemOutcome::Failed => {
                    report.failed += 1;
                    report.attempted += 1;
                }
                ItemOutcome::Skipped => report.skipped += 1,
            }
        }

        timer.stop();
        tracing::info!(
            ?kind,
            synced = report.synced,
            failed = report.failed,
            skipped = report.skipped,
            "Sync pass finished"
        );

        Ok(report)
    }

    async fn process_item(&self, item: &SyncQueueItem) -> StoreResult<ItemOutcome> {
        match self
            .store
            .set_sync_status(&item.record_id, SyncStatus::Syncing)
            .await
        {
            Ok(()) => {}
            Err(StoreError::RecordNotFound(_)) => {
                // Record deleted since the snapshot; drop the orphan entry
                self.store.remove_queue_item(&item.id).await?;
                return Ok(ItemOutcome::Skipped);
            }
            Err(StoreError::InvalidTransition { from, to }) => {
                tracing::warn!(record_id = %item.record_id, %from, %to, "Skipping item in unexpected state");
                return Ok(ItemOutcome::Skipped);
            }
            Err(e) => return Err(e),
        }

        let outcome = tokio::time::timeout(self.config.push_timeout, self.remote.push(item)).await;

        match outcome {
            Ok(Ok(true)) => {
                self.store
                    .set_sync_status(&item.record_id, SyncStatus::Synced)
                    .await?;
                self.store.remove_queue_item(&item.id).await?;
                counter!("sync.items.synced").increment(1);
                tracing::debug!(record_id = %item.record_id, action = %item.action, "Item synced");
                Ok(ItemOutcome::Synced)
            }
            other => {
                let reason = match other {
                    Ok(Ok(false)) => "Remote did not confirm the item".to_string(),
                    Ok(Err(e)) => e.to_string(),
                    Err(_) => format!("Push timed out after {:?}", self.config.push_timeout),
                    Ok(Ok(true)) => unreachable!(),
                };

                self.store
                    .set_sync_status(&item.record_id, SyncStatus::Failed)
                    .await?;
                self.store
                    .mark_item_attempt(&item.id, Some(reason.clone()))
                    .await?;
                counter!("sync.items.failed").increment(1);
                tracing::warn!(record_id = %item.record_id, attempts = item.attempts + 1, %reason, "Item push failed");
                Ok(ItemOutcome::Failed)
            }
        }
    }

    /// Whether a scheduled pass may touch this item right now.
    /// The backoff window is anchored on the last attempt so retries
    /// stay spaced no matter how long the item sat queued beforehand.
    fn eligible_for_auto(&self, item: &SyncQueueItem, now: Timestamp) -> bool {
        if item.attempts == 0 {
            return true;
        }
        if item.attempts >= self.config.max_auto_attempts {
            return false;
        }

        let anchor = item.last_attempt_at.unwrap_or(item.enqueued_at);
        let delay = backoff_delay(self.config.backoff_base, item.attempts);
        now.as_millis() >= anchor.as_millis() + delay.as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Synced,
    Failed,
    Skipped,
}

/// Exponent is capped so the delay stays bounded (base * 2^8 at most)
const BACKOFF_EXPONENT_CAP: u32 = 8;

fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    let factor = 1u64 << attempts.min(BACKOFF_EXPONENT_CAP);
    Duration::from_millis((base.as_millis() as u64).saturating_mul(factor))
}
