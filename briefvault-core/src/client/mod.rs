//! Client facade
//!
//! `OfflineClient` owns the whole subsystem lifecycle: it opens the
//! record store, wires the sync engine to the connectivity monitor,
//! runs the periodic sync timer and the reconnect listener, publishes
//! storage statistics, and tears everything down on `close`.
//!
//! Hosts talk to this type only; the store and engine stay internal
//! wiring details.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor};
use crate::store::{
    OfflineRecord, RecordId, RecordStore, StorageStats, StoreError, StoreResult,
};
use crate::sync::{RemotePush, SyncEngine, SyncReport};

pub mod cache;

pub use cache::{Clock, ResponseCache, SystemClock};

/// How long a computed stats snapshot stays valid between writes
const STATS_CACHE_TTL: Duration = Duration::from_secs(5);

type SyncCallback = Arc<dyn Fn(&SyncReport) + Send + Sync>;

/// Which flavor of sync pass to run
#[derive(Debug, Clone, Copy)]
enum PassStyle {
    Scheduled,
    Manual,
    Retry,
}

struct ClientInner {
    store: RecordStore,
    engine: SyncEngine,
    monitor: Arc<ConnectivityMonitor>,
    stats_tx: watch::Sender<StorageStats>,
    stats_cache: ResponseCache<StorageStats>,
    observers: Mutex<Vec<(u64, SyncCallback)>>,
    next_observer_id: AtomicU64,
    last_error: Mutex<Option<String>>,
    closed: AtomicBool,
}

impl ClientInner {
    async fn run_pass(&self, style: PassStyle) -> StoreResult<SyncReport> {
        let result = match style {
            PassStyle::Scheduled => self.engine.sync_scheduled().await,
            PassStyle::Manual => self.engine.sync_pending().await,
            PassStyle::Retry => self.engine.retry_failed().await,
        };

        match result {
            Ok(report) => {
                if report.ran {
                    self.refresh_stats().await?;
                    self.set_last_error(if report.failed > 0 {
                        Some(format!("{} item(s) failed to sync", report.failed))
                    } else {
                        None
                    });
                    self.notify_observers(&report);
                }
                Ok(report)
            }
            Err(e) => {
                self.set_last_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Recompute stats and publish through the cache and the watch channel
    async fn refresh_stats(&self) -> StoreResult<StorageStats> {
        let stats = self.store.storage_stats().await?;
        self.stats_cache.put(stats.clone());
        // Send fails only when every receiver is gone
        let _ = self.stats_tx.send(stats.clone());
        Ok(stats)
    }

    fn notify_observers(&self, report: &SyncReport) {
        // Snapshot the callbacks so none of them runs under the lock;
        // a callback may drop its own subscription or register a new one
        let callbacks: Vec<SyncCallback> = {
            let observers = self.observers.lock().expect("observer lock poisoned");
            observers.iter().map(|(_, cb)| cb.clone()).collect()
        };
        for callback in callbacks {
            callback(report);
        }
    }

    fn set_last_error(&self, error: Option<String>) {
        *self.last_error.lock().expect("error lock poisoned") = error;
    }
}

/// Registration handle for a sync observer; dropping it unregisters
/// the callback
pub struct SyncSubscription {
    inner: Weak<ClientInner>,
    id: u64,
}

impl Drop for SyncSubscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut observers = inner.observers.lock().expect("observer lock poisoned");
            observers.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Offline-first client over the record store and sync engine
pub struct OfflineClient {
    inner: Arc<ClientInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl OfflineClient {
    /// Open the store and arm the background machinery.
    ///
    /// The store open runs first; on failure nothing has been spawned
    /// and the error surfaces to the caller as-is.
    pub async fn connect(config: Config, remote: Arc<dyn RemotePush>) -> StoreResult<Self> {
        crate::metrics::init_metrics();

        let store = RecordStore::open(&config.store).await?;
        let monitor = Arc::new(ConnectivityMonitor::new(true));

        let engine = SyncEngine::new(
            store.clone(),
            remote,
            monitor.clone(),
            config.sync.clone(),
        );

        let initial_stats = store.storage_stats().await?;
        let (stats_tx, _) = watch::channel(initial_stats);

        let inner = Arc::new(ClientInner {
            store,
            engine,
            monitor,
            stats_tx,
            stats_cache: ResponseCache::new(STATS_CACHE_TTL),
            observers: Mutex::new(Vec::new()),
            next_observer_id: AtomicU64::new(1),
            last_error: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let timer = tokio::spawn(Self::timer_loop(inner.clone(), config.sync.sync_interval));
        let listener = tokio::spawn(Self::reconnect_loop(
            inner.clone(),
            config.sync.reconnect_settle,
        ));

        tracing::info!("Offline client connected");

        Ok(OfflineClient {
            inner,
            tasks: Mutex::new(vec![timer, listener]),
        })
    }

    /// Periodic sync driver; ticks are skipped while offline
    async fn timer_loop(inner: Arc<ClientInner>, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately; skip it, connect already
        // published initial state
        interval.tick().await;

        loop {
            interval.tick().await;
            if inner.closed.load(Ordering::SeqCst) {
                break;
            }
            if !inner.monitor.is_online() {
                continue;
            }
            if let Err(e) = inner.run_pass(PassStyle::Scheduled).await {
                tracing::warn!(error = %e, "Scheduled sync pass failed");
            }
        }
    }

    /// Catch-up sync after the connection comes back. The settle delay
    /// lets flapping links calm down; the flag is re-checked afterwards.
    async fn reconnect_loop(inner: Arc<ClientInner>, settle: Duration) {
        let mut events = inner.monitor.subscribe();

        loop {
            match events.recv().await {
                Ok(ConnectivityEvent::Online) => {
                    tokio::time::sleep(settle).await;
                    if inner.closed.load(Ordering::SeqCst) {
                        break;
                    }
                    if !inner.monitor.is_online() {
                        continue;
                    }
                    tracing::info!("Connection restored, starting catch-up sync");
                    if let Err(e) = inner.run_pass(PassStyle::Manual).await {
                        tracing::warn!(error = %e, "Catch-up sync failed");
                    }
                }
                Ok(ConnectivityEvent::Offline) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(StoreError::StorageUnavailable(
                "Client is closed".to_string(),
            ));
        }
        Ok(())
    }

    // ===== Record operations =====

    /// Persist a record locally and enqueue it for sync
    pub async fn store(
        &self,
        record_type: &str,
        payload: serde_json::Value,
        encrypt: bool,
    ) -> StoreResult<RecordId> {
        self.ensure_open()?;
        let id = self.inner.store.store(record_type, payload, encrypt).await?;
        self.inner.refresh_stats().await?;
        Ok(id)
    }

    pub async fn get(&self, id: &RecordId) -> StoreResult<Option<OfflineRecord>> {
        self.ensure_open()?;
        self.inner.store.get(id).await
    }

    pub async fn get_all(&self, record_type: &str) -> StoreResult<Vec<OfflineRecord>> {
        self.ensure_open()?;
        self.inner.store.get_all(record_type).await
    }

    pub async fn update(&self, id: &RecordId, payload: serde_json::Value) -> StoreResult<()> {
        self.ensure_open()?;
        self.inner.store.update(id, payload).await?;
        self.inner.refresh_stats().await?;
        Ok(())
    }

    /// Hard local delete; also drops any pending queue entry
    pub async fn remove(&self, id: &RecordId) -> StoreResult<()> {
        self.ensure_open()?;
        self.inner.store.delete(id).await?;
        self.inner.refresh_stats().await?;
        Ok(())
    }

    /// Wipe all local data (logout/reset)
    pub async fn clear_all(&self) -> StoreResult<()> {
        self.ensure_open()?;
        self.inner.store.clear_all().await?;
        self.inner.refresh_stats().await?;
        Ok(())
    }

    // ===== Sync operations =====

    /// Explicit sync over the whole queue, ignoring per-item backoff
    pub async fn sync(&self) -> StoreResult<SyncReport> {
        self.ensure_open()?;
        self.inner.run_pass(PassStyle::Manual).await
    }

    /// Reprocess items whose record is in the failed state
    pub async fn retry_failed(&self) -> StoreResult<SyncReport> {
        self.ensure_open()?;
        self.inner.run_pass(PassStyle::Retry).await
    }

    /// Register a callback invoked after every sync pass that ran.
    /// Dropping the returned subscription unregisters it.
    pub fn on_sync<F>(&self, callback: F) -> SyncSubscription
    where
        F: Fn(&SyncReport) + Send + Sync + 'static,
    {
        let id = self.inner.next_observer_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .observers
            .lock()
            .expect("observer lock poisoned")
            .push((id, Arc::new(callback)));

        SyncSubscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    // ===== Introspection =====

    /// Current storage statistics, memoized briefly between writes
    pub async fn stats(&self) -> StoreResult<StorageStats> {
        self.ensure_open()?;
        if let Some(stats) = self.inner.stats_cache.get() {
            return Ok(stats);
        }
        self.inner.refresh_stats().await
    }

    /// Watch channel carrying every published stats snapshot
    pub fn watch_stats(&self) -> watch::Receiver<StorageStats> {
        self.inner.stats_tx.subscribe()
    }

    pub fn is_online(&self) -> bool {
        self.inner.monitor.is_online()
    }

    /// Report a connectivity change from the host runtime
    pub fn set_online(&self, online: bool) {
        self.inner.monitor.set_online(online);
    }

    pub fn is_initialized(&self) -> bool {
        !self.inner.closed.load(Ordering::SeqCst)
    }

    /// Error string from the most recent failed pass, if any
    pub fn last_error(&self) -> Option<String> {
        self.inner.last_error.lock().expect("error lock poisoned").clone()
    }

    /// Stop background tasks and refuse further operations. Idempotent.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut tasks = self.tasks.lock().expect("task lock poisoned");
        for task in tasks.drain(..) {
            task.abort();
        }
        tracing::info!("Offline client closed");
    }
}

impl Drop for OfflineClient {
    fn drop(&mut self) {
        self.close();
    }
}
