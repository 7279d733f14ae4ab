//! # Download Queue Processor
//!
//! Persistent FIFO of tracks to materialize locally, drained by a bounded pool
//! of transfer workers.
//!
//! ## Lifecycle
//!
//! ```text
//! enqueue ──> [pending] ──claim──> [downloading] ──> [completed]
//!                 ↑                      │
//!                 └──── retry_failed ── [failed]
//! ```
//!
//! A [`DownloadQueue`] owns its dispatcher task. `start()` re-queues items a
//! previous process left mid-transfer, then drains whenever a wake-up is
//! signalled. `process_queue()` runs one drain inline, which is what tests use.
//!
//! Per-item failures are recorded on the item and published on the event bus;
//! they never surface from `enqueue`, `process_queue` or the dispatcher.

use bridge_traits::{
    catalog::{CatalogApi, RemoteTrackMetadata},
    http::{HttpClient, HttpRequest},
    time::Clock,
};
use bytes::BytesMut;
use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, QueueEntrySnapshot};
use core_store::{DownloadQueueItem, DownloadedTrack, OfflineStore, QueueItemId, QueueStatus};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::config::DownloadConfig;
use crate::error::{DownloadError, Result};
use crate::stats::progress_percent;

/// Cap on the buffer reserved up front from an advertised content length
const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Descriptor of a track to download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueTrack {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub cover_art_url: Option<String>,
}

impl QueueTrack {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_name: artist_name.into(),
            cover_art_url: None,
        }
    }

    pub fn with_cover_art(mut self, url: impl Into<String>) -> Self {
        self.cover_art_url = Some(url.into());
        self
    }
}

/// Owned download queue processor.
pub struct DownloadQueue {
    inner: Arc<QueueInner>,
    dispatcher: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

struct QueueInner {
    config: DownloadConfig,
    store: OfflineStore,
    catalog: Arc<dyn CatalogApi>,
    http: Arc<dyn HttpClient>,
    events: EventBus,
    clock: Arc<dyn Clock>,
    workers: Arc<Semaphore>,
    /// Held by whichever caller is running a drain
    draining: AtomicBool,
    /// Set by every trigger; a finishing drain re-checks it
    rerun: AtomicBool,
    /// Set by `stop()`; no new items are claimed while true
    halted: AtomicBool,
    wake: Notify,
    /// Tokens of claimed items, by item id
    active: Mutex<HashMap<QueueItemId, CancellationToken>>,
    /// Read-held by each transfer from claim to outcome; write-held by [`QueuePause`]
    gate: Arc<RwLock<()>>,
}

/// A claimed item, its cancellation token and its hold on the pause gate
struct Claim {
    item: DownloadQueueItem,
    token: CancellationToken,
    _gate: OwnedRwLockReadGuard<()>,
}

/// Holds the queue idle. No transfer is running or can start until dropped.
pub struct QueuePause {
    inner: Arc<QueueInner>,
    _gate: OwnedRwLockWriteGuard<()>,
}

impl Drop for QueuePause {
    fn drop(&mut self) {
        self.inner.trigger();
    }
}

impl DownloadQueue {
    /// Create a queue processor over `store`.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Config` if `config` is invalid.
    pub fn new(
        config: DownloadConfig,
        store: OfflineStore,
        catalog: Arc<dyn CatalogApi>,
        http: Arc<dyn HttpClient>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let workers = Arc::new(Semaphore::new(config.max_concurrent_downloads));
        Ok(Self {
            inner: Arc::new(QueueInner {
                config,
                store,
                catalog,
                http,
                events,
                clock,
                workers,
                draining: AtomicBool::new(false),
                rerun: AtomicBool::new(false),
                halted: AtomicBool::new(false),
                wake: Notify::new(),
                active: Mutex::new(HashMap::new()),
                gate: Arc::new(RwLock::new(())),
            }),
            dispatcher: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.inner.config
    }

    /// Re-queue interrupted items and launch the dispatcher.
    ///
    /// Calling `start` on a running queue does nothing.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock().await;
        if dispatcher.is_some() {
            return Ok(());
        }

        let requeued = self.inner.store.queue().reset_interrupted().await?;
        if requeued > 0 {
            info!(requeued, "Re-queued interrupted downloads");
        }

        self.inner.halted.store(false, Ordering::SeqCst);

        let token = CancellationToken::new();
        let cancel = token.clone();
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = inner.wake.notified() => inner.drain().await,
                }
            }
            debug!("Download dispatcher stopped");
        });

        *dispatcher = Some((token, handle));
        self.inner.trigger();

        info!(
            workers = self.inner.config.max_concurrent_downloads,
            "Download queue started"
        );
        Ok(())
    }

    /// Stop the dispatcher and abort every running transfer.
    ///
    /// Aborted items resolve to `failed`. Pending items stay queued for the
    /// next `start`.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let Some((token, handle)) = self.dispatcher.lock().await.take() else {
            return;
        };

        self.inner.halted.store(true, Ordering::SeqCst);
        token.cancel();
        self.inner.cancel_active().await;

        if let Err(e) = handle.await {
            warn!(error = %e, "Download dispatcher ended abnormally");
        }
        info!("Download queue stopped");
    }

    /// Add a track to the queue.
    ///
    /// Returns `false` without touching the queue when the track is already
    /// downloaded or already has a pending or downloading item.
    #[instrument(skip(self, track), fields(track_id = %track.id))]
    pub async fn enqueue(&self, track: QueueTrack) -> Result<bool> {
        let store = &self.inner.store;

        if store.downloads().exists(&track.id).await? {
            debug!("Track already downloaded");
            return Ok(false);
        }

        if store.queue().find_active_by_track(&track.id).await?.is_some() {
            debug!("Track already queued");
            return Ok(false);
        }

        let item = DownloadQueueItem::new(
            track.id,
            track.title,
            track.artist_name,
            track.cover_art_url,
            self.inner.clock.unix_timestamp_millis(),
        );

        // A concurrent enqueue of the same track loses on the unique index
        if !store.queue().insert_if_absent(&item).await? {
            debug!("Track queued concurrently");
            return Ok(false);
        }

        info!(item_id = %item.id, "Track queued for download");
        self.inner.publish_snapshot().await;
        self.inner.trigger();
        Ok(true)
    }

    /// Enqueue each track in order; returns how many were inserted.
    pub async fn enqueue_many(&self, tracks: Vec<QueueTrack>) -> Result<usize> {
        let mut inserted = 0;
        for track in tracks {
            if self.enqueue(track).await? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Drop the pending or downloading item for `track_id`.
    ///
    /// An item that is mid-transfer has its transfer cancelled as well.
    #[instrument(skip(self))]
    pub async fn remove_from_queue(&self, track_id: &str) -> Result<bool> {
        let Some(item) = self
            .inner
            .store
            .queue()
            .remove_active_by_track(track_id)
            .await?
        else {
            return Ok(false);
        };

        if item.status == QueueStatus::Downloading {
            if let Some(token) = self.inner.active.lock().await.get(&item.id) {
                info!("Cancelling transfer of removed item");
                token.cancel();
            }
        }

        self.inner.publish_snapshot().await;
        Ok(true)
    }

    /// Reset every failed item to pending and drain again.
    #[instrument(skip(self))]
    pub async fn retry_failed(&self) -> Result<u64> {
        let reset = self.inner.store.queue().reset_failed().await?;
        if reset > 0 {
            info!(reset, "Retrying failed downloads");
            self.inner.publish_snapshot().await;
            self.inner.trigger();
        }
        Ok(reset)
    }

    /// Purge completed and failed items.
    #[instrument(skip(self))]
    pub async fn clear_completed(&self) -> Result<u64> {
        let removed = self.inner.store.queue().delete_terminal().await?;
        if removed > 0 {
            debug!(removed, "Cleared finished queue items");
            self.inner.publish_snapshot().await;
        }
        Ok(removed)
    }

    /// Abort the running transfer(s). Returns whether anything was running.
    pub async fn cancel_current(&self) -> bool {
        self.inner.cancel_active().await
    }

    /// Cancel running transfers and wait for them to record their outcome.
    ///
    /// Nothing is claimed while the returned guard lives. Dropping it wakes
    /// the dispatcher.
    #[instrument(skip(self))]
    pub async fn pause(&self) -> QueuePause {
        self.inner.cancel_active().await;
        let gate = Arc::clone(&self.inner.gate).write_owned().await;
        debug!("Download queue paused");
        QueuePause {
            inner: Arc::clone(&self.inner),
            _gate: gate,
        }
    }

    /// Every queue item, oldest first
    pub async fn get_queue(&self) -> Result<Vec<DownloadQueueItem>> {
        Ok(self.inner.store.queue().list().await?)
    }

    /// Items that are pending or downloading
    pub async fn pending_count(&self) -> Result<u64> {
        Ok(self
            .inner
            .store
            .queue()
            .count_by_statuses(&[QueueStatus::Pending, QueueStatus::Downloading])
            .await?)
    }

    /// Run one drain inline.
    ///
    /// Returns immediately if a drain is already running; that drain picks up
    /// any work queued in the meantime.
    pub async fn process_queue(&self) {
        self.inner.drain().await;
    }
}

impl QueueInner {
    fn trigger(&self) {
        self.rerun.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn emit(&self, event: DownloadEvent) {
        self.events.emit(CoreEvent::Download(event)).ok();
    }

    async fn cancel_active(&self) -> bool {
        let active = self.active.lock().await;
        for token in active.values() {
            token.cancel();
        }
        !active.is_empty()
    }

    async fn publish_snapshot(&self) {
        match self.store.queue().list().await {
            Ok(items) => {
                let snapshot = items.iter().map(snapshot_entry).collect();
                self.emit(DownloadEvent::QueueUpdate { snapshot });
            }
            Err(e) => warn!(error = %e, "Failed to read queue for snapshot"),
        }
    }

    async fn drain(self: &Arc<Self>) {
        self.rerun.store(true, Ordering::SeqCst);
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }

        loop {
            self.rerun.store(false, Ordering::SeqCst);
            self.drain_pass().await;
            self.draining.store(false, Ordering::SeqCst);

            // A trigger that raced the end of the pass gets another pass
            if self.halted.load(Ordering::SeqCst)
                || !self.rerun.load(Ordering::SeqCst)
                || self.draining.swap(true, Ordering::SeqCst)
            {
                break;
            }
        }
    }

    async fn drain_pass(self: &Arc<Self>) {
        let mut transfers = JoinSet::new();

        loop {
            if self.halted.load(Ordering::SeqCst) {
                break;
            }

            let permit = match Arc::clone(&self.workers).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            if self.halted.load(Ordering::SeqCst) {
                break;
            }

            let claim = match self.claim_next().await {
                Ok(Some(claim)) => claim,
                Ok(None) => {
                    drop(permit);
                    // A running transfer may finish and free the way for
                    // items queued while it ran
                    if let Some(joined) = transfers.join_next().await {
                        log_join_error(joined);
                        continue;
                    }
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to claim next queue item");
                    break;
                }
            };

            let inner = Arc::clone(self);
            transfers.spawn(async move {
                let _permit = permit;
                inner.run_transfer(claim).await;
            });
        }

        while let Some(joined) = transfers.join_next().await {
            log_join_error(joined);
        }
    }

    /// Oldest pending item, moved to `downloading`
    ///
    /// The token is visible in `active` before the row turns `downloading`, so
    /// a removal or cancel never sees a claimed item without a token.
    async fn claim_next(&self) -> Result<Option<Claim>> {
        let gate = Arc::clone(&self.gate).read_owned().await;

        loop {
            let Some(mut item) = self.store.queue().next_pending().await? else {
                return Ok(None);
            };

            let token = CancellationToken::new();
            self.active.lock().await.insert(item.id, token.clone());

            match self.store.queue().claim(&item.id).await {
                Ok(true) => {}
                // Lost to a removal; look again
                Ok(false) => {
                    self.active.lock().await.remove(&item.id);
                    continue;
                }
                Err(e) => {
                    self.active.lock().await.remove(&item.id);
                    return Err(e.into());
                }
            }

            if self.halted.load(Ordering::SeqCst) {
                token.cancel();
            }

            item.status = QueueStatus::Downloading;
            self.publish_snapshot().await;
            return Ok(Some(Claim {
                item,
                token,
                _gate: gate,
            }));
        }
    }

    #[instrument(skip(self, claim), fields(track_id = %claim.item.track_id, item_id = %claim.item.id))]
    async fn run_transfer(&self, claim: Claim) {
        let Claim { item, token, _gate } = claim;

        info!(title = %item.title, "Starting download");
        let outcome = self.transfer(&item, &token).await;
        self.active.lock().await.remove(&item.id);

        match outcome {
            Ok(size) => {
                let completed_at = self.clock.unix_timestamp_millis();
                if let Err(e) = self.store.queue().mark_completed(&item.id, completed_at).await {
                    warn!(error = %e, "Failed to mark queue item completed");
                }
                info!(bytes = size, "Download complete");
                self.emit(DownloadEvent::Complete {
                    track_id: item.track_id.clone(),
                    title: item.title.clone(),
                });
            }
            Err(e) => {
                let message = e.to_string();
                if e.is_transfer() {
                    warn!(error = %message, "Download aborted");
                } else {
                    error!(error = %message, "Download failed");
                }
                if let Err(store_err) = self.store.queue().mark_failed(&item.id, &message).await {
                    warn!(error = %store_err, "Failed to mark queue item failed");
                }
                self.emit(DownloadEvent::Error {
                    track_id: item.track_id.clone(),
                    title: item.title.clone(),
                    error: message,
                });
            }
        }

        self.publish_snapshot().await;
    }

    /// Fetch, validate and persist one track. Returns the payload size.
    async fn transfer(&self, item: &DownloadQueueItem, token: &CancellationToken) -> Result<u64> {
        let url = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DownloadError::Cancelled),
            resolved = self.catalog.resolve_stream_url(&item.track_id, self.config.stream_quality) => {
                resolved.map_err(|e| DownloadError::SourceResolution(e.to_string()))?
            }
        };

        let stream = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(DownloadError::Cancelled),
            opened = self.http.download_stream(url) => {
                opened.map_err(|e| DownloadError::Transfer(e.to_string()))?
            }
        };

        let total = stream.content_length.filter(|total| *total > 0);
        let mut chunks = stream.chunks;
        let mut payload =
            BytesMut::with_capacity(total.unwrap_or(0).min(MAX_PREALLOCATION) as usize);
        let mut last_progress = 0u8;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(DownloadError::Cancelled),
                next = chunks.next() => next,
            };

            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| DownloadError::Transfer(e.to_string()))?;
            payload.extend_from_slice(&chunk);

            if let Some(total) = total {
                let received = payload.len() as u64;
                let progress = progress_percent(received, total);
                if progress != last_progress {
                    last_progress = progress;
                    if let Err(e) = self.store.queue().update_progress(&item.id, progress).await {
                        warn!(error = %e, "Failed to persist download progress");
                    }
                }
                self.emit(DownloadEvent::Progress {
                    track_id: item.track_id.clone(),
                    progress,
                    received,
                    total,
                });
            }
        }

        let received = payload.len() as u64;
        if received == 0 {
            return Err(DownloadError::Transfer("Empty payload".to_string()));
        }
        if let Some(total) = total {
            if received != total {
                return Err(DownloadError::Transfer(format!(
                    "Truncated payload: received {} of {} bytes",
                    received, total
                )));
            }
        }

        let mut track = DownloadedTrack::new(
            &item.track_id,
            &item.title,
            &item.artist_name,
            received,
            self.clock.unix_timestamp_millis(),
        );
        track.cover_art_url = item.cover_art_url.clone();

        if self.config.fetch_metadata {
            match self.fetch_metadata(&item.track_id).await {
                Ok(metadata) => apply_metadata(&mut track, metadata),
                Err(e) => warn!(error = %e, "Using default metadata"),
            }
        }

        self.store
            .downloads()
            .insert(&track, &payload)
            .await
            .map_err(|e| DownloadError::StorageWrite(e.to_string()))?;
        debug!(bytes = received, "Payload stored");

        if self.config.cache_cover_art {
            if let Some(url) = &item.cover_art_url {
                if let Err(e) = self.cache_cover_art(url).await {
                    warn!(error = %e, "Failed to cache cover art");
                }
            }
        }

        Ok(received)
    }

    async fn fetch_metadata(&self, track_id: &str) -> Result<RemoteTrackMetadata> {
        self.catalog
            .fetch_track_metadata(track_id)
            .await
            .map_err(|e| DownloadError::MetadataFetch(e.to_string()))
    }

    async fn cache_cover_art(&self, url: &str) -> Result<()> {
        if self.store.covers().contains(url).await? {
            return Ok(());
        }

        let response = self
            .http
            .execute(HttpRequest::get(url))
            .await
            .map_err(|e| DownloadError::Transfer(e.to_string()))?;
        if !response.is_success() {
            return Err(DownloadError::Transfer(format!(
                "Cover art request returned {}",
                response.status
            )));
        }

        self.store
            .covers()
            .put(url, &response.body, self.clock.unix_timestamp_millis())
            .await?;
        debug!(bytes = response.body.len(), "Cover art cached");
        Ok(())
    }
}

fn apply_metadata(track: &mut DownloadedTrack, metadata: RemoteTrackMetadata) {
    track.artist_id = metadata.artist_id.unwrap_or_default();
    track.album_id = metadata.album_id;
    track.album_title = metadata.album_title;
    track.duration_ms = metadata.duration_ms.unwrap_or(0);
    track.genres = metadata.genres;
}

fn snapshot_entry(item: &DownloadQueueItem) -> QueueEntrySnapshot {
    QueueEntrySnapshot {
        id: item.id.as_str(),
        track_id: item.track_id.clone(),
        title: item.title.clone(),
        artist_name: item.artist_name.clone(),
        status: item.status.as_str().to_string(),
        progress: item.progress,
        error: item.error.clone(),
    }
}

fn log_join_error(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Transfer task ended abnormally");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::catalog::{LikeAction, PlaySubmission, StreamQuality};
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{ByteStream, HttpResponse};
    use bridge_traits::time::SystemClock;
    use core_store::db::create_test_pool;

    /// Collaborators for tests that never get past cancellation
    struct Offline;

    #[async_trait]
    impl CatalogApi for Offline {
        async fn resolve_stream_url(&self, _: &str, _: StreamQuality) -> BridgeResult<String> {
            unimplemented!("cancelled transfers never resolve")
        }

        async fn fetch_track_metadata(&self, _: &str) -> BridgeResult<RemoteTrackMetadata> {
            unimplemented!()
        }

        async fn submit_play(&self, _: &PlaySubmission) -> BridgeResult<()> {
            unimplemented!()
        }

        async fn submit_like(&self, _: &str, _: LikeAction, _: &str) -> BridgeResult<()> {
            unimplemented!()
        }
    }

    #[async_trait]
    impl HttpClient for Offline {
        async fn execute(&self, _: HttpRequest) -> BridgeResult<HttpResponse> {
            unimplemented!()
        }

        async fn download_stream(&self, _: String) -> BridgeResult<ByteStream> {
            unimplemented!()
        }
    }

    async fn queue() -> (DownloadQueue, OfflineStore) {
        let store = OfflineStore::new(create_test_pool().await.unwrap());
        let queue = DownloadQueue::new(
            DownloadConfig::default(),
            store.clone(),
            Arc::new(Offline),
            Arc::new(Offline),
            EventBus::default(),
            Arc::new(SystemClock),
        )
        .unwrap();
        (queue, store)
    }

    #[tokio::test]
    async fn test_removal_between_claim_and_spawn_cancels_transfer() {
        let (queue, store) = queue().await;
        queue.enqueue(QueueTrack::new("t1", "Song", "Artist")).await.unwrap();

        let claim = queue.inner.claim_next().await.unwrap().unwrap();
        assert!(!claim.token.is_cancelled());

        assert!(queue.remove_from_queue("t1").await.unwrap());
        assert!(claim.token.is_cancelled());

        queue.inner.run_transfer(claim).await;
        assert!(!store.downloads().exists("t1").await.unwrap());
        assert!(store.queue().list().await.unwrap().is_empty());
        assert!(queue.inner.active.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_current_sees_freshly_claimed_item() {
        let (queue, store) = queue().await;
        queue.enqueue(QueueTrack::new("t1", "Song", "Artist")).await.unwrap();

        let claim = queue.inner.claim_next().await.unwrap().unwrap();
        assert!(queue.cancel_current().await);
        assert!(claim.token.is_cancelled());

        let id = claim.item.id;
        queue.inner.run_transfer(claim).await;
        let item = store.queue().find(&id).await.unwrap().unwrap();
        assert_eq!(item.status, QueueStatus::Failed);
    }

    #[tokio::test]
    async fn test_pause_waits_for_claimed_transfer() {
        let (queue, store) = queue().await;
        let queue = Arc::new(queue);
        queue.enqueue(QueueTrack::new("t1", "Song", "Artist")).await.unwrap();
        let claim = queue.inner.claim_next().await.unwrap().unwrap();

        let pausing = tokio::spawn({
            let queue = Arc::clone(&queue);
            async move {
                let _pause = queue.pause().await;
            }
        });
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(claim.token.is_cancelled());
        assert!(!pausing.is_finished());

        queue.inner.run_transfer(claim).await;
        pausing.await.unwrap();
        assert_eq!(
            store.queue().list().await.unwrap()[0].status,
            QueueStatus::Failed
        );
    }

    #[test]
    fn test_queue_track_builder() {
        let track = QueueTrack::new("t1", "Song", "Artist").with_cover_art("https://cdn/c.jpg");
        assert_eq!(track.id, "t1");
        assert_eq!(track.cover_art_url.as_deref(), Some("https://cdn/c.jpg"));
    }

    #[test]
    fn test_apply_metadata_defaults() {
        let mut track = DownloadedTrack::new("t1", "Song", "Artist", 10, 0);
        apply_metadata(
            &mut track,
            RemoteTrackMetadata {
                album_title: Some("Album".to_string()),
                genres: vec!["rock".to_string()],
                ..Default::default()
            },
        );

        assert_eq!(track.artist_id, "");
        assert_eq!(track.album_title.as_deref(), Some("Album"));
        assert_eq!(track.duration_ms, 0);
        assert_eq!(track.genres, vec!["rock".to_string()]);
    }

    #[test]
    fn test_snapshot_entry() {
        let item = DownloadQueueItem::new("t1", "Song", "Artist", None, 5);
        let entry = snapshot_entry(&item);
        assert_eq!(entry.status, "pending");
        assert_eq!(entry.progress, 0);
        assert_eq!(entry.id, item.id.as_str());
    }
}
