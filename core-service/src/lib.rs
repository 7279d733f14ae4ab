//! Core service façade and bootstrap.
//!
//! [`OfflineCore`] wires the host-provided bridges from a
//! [`CoreConfig`](core_runtime::CoreConfig) into the offline store, the
//! download queue, the eviction manager and the sync reconciler, and exposes
//! every operation to the host through one handle.
//!
//! ```rust,ignore
//! use core_runtime::CoreConfig;
//! use core_service::OfflineCore;
//!
//! let config = CoreConfig::builder()
//!     .database_path("offline.db")
//!     .api_base_url("https://music.example.com")
//!     .storage_budget_bytes(2 * 1024 * 1024 * 1024)
//!     .auto_evict(true)
//!     .build()?;
//!
//! let core = OfflineCore::bootstrap(config).await?;
//! core.start().await?;
//! core.enqueue(QueueTrack::new("track-1", "Song", "Artist")).await?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_download::{
    format_bytes, DownloadConfig, DownloadQueue, OfflineLibrary, QueueTrack, StorageInfo,
    StorageManager, StorageStats,
};
pub use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, EventChannel, Subscription, SyncEvent};
pub use core_runtime::{CoreConfig, CoreConfigBuilder};
pub use core_store::{ActionId, DownloadQueueItem, DownloadedTrack, QueueStatus};
pub use core_sync::{SyncConfig, SyncSummary, UnsyncedCounts};

use bridge_traits::{catalog::CatalogApi, storage::StorageEstimate};
use core_runtime::events::RecvError;
use core_store::{
    db::{open_store, DatabaseConfig},
    OfflineStore,
};
use core_sync::{ConnectivityWatcher, SyncReconciler};
use provider_catalog::CatalogConnector;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Background tasks owned by a started core
struct Background {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Primary façade exposed to host applications.
pub struct OfflineCore {
    config: CoreConfig,
    store: OfflineStore,
    events: EventBus,
    queue: Arc<DownloadQueue>,
    library: OfflineLibrary,
    storage: StorageManager,
    reconciler: Arc<SyncReconciler>,
    background: Mutex<Option<Background>>,
}

impl OfflineCore {
    /// Open the store and build every component against the catalog API at
    /// `config.api_base_url`.
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let catalog: Arc<dyn CatalogApi> = Arc::new(CatalogConnector::new(
            Arc::clone(&config.http_client),
            config.api_base_url.clone(),
        ));
        Self::bootstrap_with_catalog(config, catalog).await
    }

    /// Like [`bootstrap`](Self::bootstrap) with a host-supplied catalog.
    #[instrument(skip_all)]
    pub async fn bootstrap_with_catalog(
        config: CoreConfig,
        catalog: Arc<dyn CatalogApi>,
    ) -> Result<Self> {
        config.validate()?;

        let database = if config.is_in_memory() {
            DatabaseConfig::in_memory()
        } else {
            DatabaseConfig::new(config.database_path.clone())
        };
        let store = open_store(database)
            .await
            .map_err(|e| CoreError::InitializationFailed(format!("Failed to open store: {}", e)))?;

        let events = EventBus::new(config.event_buffer_size);

        let download_config = DownloadConfig::new()
            .with_max_concurrent_downloads(config.max_concurrent_downloads)
            .with_stream_quality(config.stream_quality);
        let queue = DownloadQueue::new(
            download_config,
            store.clone(),
            Arc::clone(&catalog),
            Arc::clone(&config.http_client),
            events.clone(),
            Arc::clone(&config.clock),
        )?;

        let library = OfflineLibrary::new(store.clone(), Arc::clone(&config.clock));
        let storage = StorageManager::new(
            store.clone(),
            config.storage_quota.clone(),
            config.storage_budget_bytes,
        );

        let reconciler = SyncReconciler::new(
            SyncConfig::new().with_retention_days(config.sync_retention_days),
            store.clone(),
            catalog,
            events.clone(),
            Arc::clone(&config.clock),
        )?;

        info!(
            workers = config.max_concurrent_downloads,
            budget = ?config.storage_budget_bytes,
            auto_evict = config.auto_evict,
            "Offline core ready"
        );

        Ok(Self {
            config,
            store,
            events,
            queue: Arc::new(queue),
            library,
            storage,
            reconciler: Arc::new(reconciler),
            background: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Start the queue processor, budget enforcement and connectivity watcher.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut background = self.background.lock().await;
        if background.is_some() {
            return Ok(());
        }

        if let Err(e) = self.reconciler.cleanup_expired().await {
            warn!(error = %e, "Failed to purge delivered offline actions");
        }

        self.queue.start().await?;

        let cancel = CancellationToken::new();
        let mut tasks = Vec::new();

        if self.config.auto_evict {
            tasks.push(self.spawn_budget_enforcer(cancel.child_token()));
        }

        if let Some(monitor) = &self.config.network_monitor {
            let watcher = ConnectivityWatcher::new(Arc::clone(&self.reconciler), Arc::clone(monitor));
            tasks.push(watcher.spawn(cancel.child_token()));
        } else {
            debug!("No network monitor; offline sync runs on demand only");
        }

        *background = Some(Background { cancel, tasks });
        info!("Offline core started");
        Ok(())
    }

    /// Stop background work. Running transfers resolve to `failed`.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        let Some(background) = self.background.lock().await.take() else {
            return;
        };

        background.cancel.cancel();
        self.queue.stop().await;

        for task in background.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Offline core stopped");
    }

    fn spawn_budget_enforcer(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let storage = self.storage.clone();
        let mut completed = self.events.subscribe_channel(EventChannel::Complete);

        tokio::spawn(async move {
            loop {
                let received = tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = completed.recv() => received,
                };

                match received {
                    // A lagged subscriber still owes a budget check
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        if let Err(e) = storage.enforce_budget().await {
                            warn!(error = %e, "Storage budget enforcement failed");
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Budget enforcer stopped");
        })
    }

    // ========================================================================
    // Download queue
    // ========================================================================

    pub async fn enqueue(&self, track: QueueTrack) -> Result<bool> {
        Ok(self.queue.enqueue(track).await?)
    }

    pub async fn enqueue_many(&self, tracks: Vec<QueueTrack>) -> Result<usize> {
        Ok(self.queue.enqueue_many(tracks).await?)
    }

    pub async fn remove_from_queue(&self, track_id: &str) -> Result<bool> {
        Ok(self.queue.remove_from_queue(track_id).await?)
    }

    pub async fn retry_failed(&self) -> Result<u64> {
        Ok(self.queue.retry_failed().await?)
    }

    pub async fn clear_completed(&self) -> Result<u64> {
        Ok(self.queue.clear_completed().await?)
    }

    pub async fn cancel_current(&self) -> bool {
        self.queue.cancel_current().await
    }

    pub async fn queue(&self) -> Result<Vec<DownloadQueueItem>> {
        Ok(self.queue.get_queue().await?)
    }

    pub async fn pending_count(&self) -> Result<u64> {
        Ok(self.queue.pending_count().await?)
    }

    /// Drain the queue inline, for hosts that do not call `start`
    pub async fn process_queue(&self) {
        self.queue.process_queue().await;
    }

    // ========================================================================
    // Library
    // ========================================================================

    pub async fn downloaded_tracks(&self) -> Result<Vec<DownloadedTrack>> {
        Ok(self.library.downloaded_tracks().await?)
    }

    pub async fn is_downloaded(&self, track_id: &str) -> Result<bool> {
        Ok(self.library.is_downloaded(track_id).await?)
    }

    pub async fn downloaded_track_ids(&self) -> Result<HashSet<String>> {
        Ok(self.library.downloaded_track_ids().await?)
    }

    pub async fn downloaded_track_count(&self) -> Result<u64> {
        Ok(self.library.downloaded_track_count().await?)
    }

    pub async fn delete_download(&self, track_id: &str) -> Result<bool> {
        Ok(self.library.delete_download(track_id).await?)
    }

    pub async fn open_track(&self, track_id: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.library.open_track(track_id).await?)
    }

    pub async fn cover_art(&self, url: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.library.cover_art(url).await?)
    }

    // ========================================================================
    // Storage
    // ========================================================================

    pub async fn storage_used(&self) -> Result<u64> {
        Ok(self.storage.storage_used().await?)
    }

    pub async fn storage_stats(&self) -> Result<StorageStats> {
        Ok(self.storage.storage_stats().await?)
    }

    pub async fn storage_estimate(&self) -> StorageEstimate {
        self.storage.storage_estimate().await
    }

    pub async fn storage_info(&self) -> StorageInfo {
        self.storage.storage_info().await
    }

    pub async fn cleanup(&self, target_bytes: u64) -> Result<u64> {
        Ok(self.storage.cleanup(target_bytes).await?)
    }

    pub async fn enforce_storage_budget(&self) -> Result<u64> {
        Ok(self.storage.enforce_budget().await?)
    }

    // ========================================================================
    // Offline actions
    // ========================================================================

    pub async fn record_play(&self, track_id: &str, duration_secs: u32) -> Result<ActionId> {
        Ok(self.reconciler.record_play(track_id, duration_secs).await?)
    }

    pub async fn record_like(&self, track_id: &str) -> Result<ActionId> {
        Ok(self.reconciler.record_like(track_id).await?)
    }

    pub async fn record_unlike(&self, track_id: &str) -> Result<ActionId> {
        Ok(self.reconciler.record_unlike(track_id).await?)
    }

    pub async fn sync_all(&self) -> Result<SyncSummary> {
        Ok(self.reconciler.sync_all().await?)
    }

    pub async fn sync_play_history(&self) -> Result<u64> {
        Ok(self.reconciler.sync_play_history().await?)
    }

    pub async fn sync_liked_tracks(&self) -> Result<u64> {
        Ok(self.reconciler.sync_liked_tracks().await?)
    }

    pub async fn unsynced_count(&self) -> Result<UnsyncedCounts> {
        Ok(self.reconciler.unsynced_count().await?)
    }

    pub async fn cleanup_synced(&self, retention_days: u32) -> Result<u64> {
        Ok(self.reconciler.cleanup(retention_days).await?)
    }

    // ========================================================================
    // Housekeeping
    // ========================================================================

    /// Cancel running transfers and delete every download, queue item, cover
    /// and offline action. Settings are kept.
    ///
    /// The queue stays paused until the tables are empty, so a transfer that
    /// was already persisting cannot write after the clear.
    #[instrument(skip(self))]
    pub async fn clear_all_offline_data(&self) -> Result<()> {
        let pause = self.queue.pause().await;
        let cleared = self.store.clear_offline_data().await;
        drop(pause);
        cleared?;
        self.events
            .emit(CoreEvent::Download(DownloadEvent::QueueUpdate {
                snapshot: Vec::new(),
            }))
            .ok();
        info!("Cleared all offline data");
        Ok(())
    }

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.settings().get(key).await?)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.store.settings().set(key, value).await?)
    }

    pub async fn delete_setting(&self, key: &str) -> Result<bool> {
        Ok(self.store.settings().delete(key).await?)
    }

    pub async fn settings(&self) -> Result<Vec<(String, String)>> {
        Ok(self.store.settings().list().await?)
    }

    pub fn subscribe(&self, channel: EventChannel) -> Subscription {
        self.events.subscribe_channel(channel)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }
}
