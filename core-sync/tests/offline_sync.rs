//! Integration tests for offline action delivery
//!
//! These tests verify:
//! - Plays recorded while offline are delivered after reconnecting
//! - The watcher syncs at start when online and on offline→online transitions
//! - Metered networks are skipped when `wifi_only` is set
//! - The watcher stops on cancellation

use async_trait::async_trait;
use bridge_traits::{
    catalog::{CatalogApi, LikeAction, PlaySubmission, RemoteTrackMetadata, StreamQuality},
    error::{BridgeError, Result as BridgeResult},
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkType},
    time::SystemClock,
};
use core_runtime::events::{CoreEvent, EventBus, EventChannel, SyncEvent};
use core_store::{db::create_test_pool, OfflineStore};
use core_sync::{ConnectivityWatcher, SyncConfig, SyncReconciler};
use mockall::mock;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Implementations
// ============================================================================

mock! {
    Catalog {}

    #[async_trait]
    impl CatalogApi for Catalog {
        async fn resolve_stream_url(&self, track_id: &str, quality: StreamQuality) -> BridgeResult<String>;
        async fn fetch_track_metadata(&self, track_id: &str) -> BridgeResult<RemoteTrackMetadata>;
        async fn submit_play(&self, play: &PlaySubmission) -> BridgeResult<()>;
        async fn submit_like(&self, track_id: &str, action: LikeAction, idempotency_key: &str) -> BridgeResult<()>;
    }
}

/// Catalog that accepts every delivery and counts them
#[derive(Default)]
struct CountingCatalog {
    delivered: AtomicUsize,
}

#[async_trait]
impl CatalogApi for CountingCatalog {
    async fn resolve_stream_url(&self, _: &str, _: StreamQuality) -> BridgeResult<String> {
        Err(BridgeError::NotAvailable("streams".to_string()))
    }

    async fn fetch_track_metadata(&self, _: &str) -> BridgeResult<RemoteTrackMetadata> {
        Err(BridgeError::NotAvailable("metadata".to_string()))
    }

    async fn submit_play(&self, _: &PlaySubmission) -> BridgeResult<()> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn submit_like(&self, _: &str, _: LikeAction, _: &str) -> BridgeResult<()> {
        self.delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct ChannelChanges {
    receiver: mpsc::UnboundedReceiver<NetworkInfo>,
}

#[async_trait]
impl NetworkChangeStream for ChannelChanges {
    async fn next(&mut self) -> Option<NetworkInfo> {
        self.receiver.recv().await
    }
}

/// Network monitor driven by the test through a channel
struct ScriptedNetwork {
    current: Arc<AsyncMutex<NetworkInfo>>,
    receiver: Arc<AsyncMutex<Option<mpsc::UnboundedReceiver<NetworkInfo>>>>,
}

impl ScriptedNetwork {
    fn new(initial: NetworkInfo) -> (Self, mpsc::UnboundedSender<NetworkInfo>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let network = Self {
            current: Arc::new(AsyncMutex::new(initial)),
            receiver: Arc::new(AsyncMutex::new(Some(receiver))),
        };
        (network, sender)
    }
}

#[async_trait]
impl NetworkMonitor for ScriptedNetwork {
    async fn get_network_info(&self) -> BridgeResult<NetworkInfo> {
        Ok(self.current.lock().await.clone())
    }

    async fn subscribe_changes(&self) -> BridgeResult<Box<dyn NetworkChangeStream>> {
        let receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| BridgeError::NotAvailable("already subscribed".to_string()))?;
        Ok(Box::new(ChannelChanges { receiver }))
    }
}

fn metered_cellular() -> NetworkInfo {
    NetworkInfo::metered(Some(NetworkType::Cellular))
}

async fn reconciler_with(
    catalog: Arc<dyn CatalogApi>,
    config: SyncConfig,
    events: &EventBus,
) -> Arc<SyncReconciler> {
    let store = OfflineStore::new(create_test_pool().await.unwrap());
    Arc::new(
        SyncReconciler::new(config, store, catalog, events.clone(), Arc::new(SystemClock)).unwrap(),
    )
}

async fn wait_for_completed(subscription: &mut core_runtime::events::Subscription) -> (u64, u64) {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(CoreEvent::Sync(SyncEvent::Completed {
                play_history,
                liked_tracks,
            })) = subscription.recv().await
            {
                return (play_history, liked_tracks);
            }
        }
    })
    .await
    .expect("sync never completed")
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_plays_recorded_offline_sync_after_reconnect() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_submit_play()
        .withf(|play| !play.idempotency_key.is_empty())
        .times(3)
        .returning(|_| Ok(()));

    let events = EventBus::new(64);
    let reconciler = reconciler_with(Arc::new(catalog), SyncConfig::default(), &events).await;
    let (network, changes) = ScriptedNetwork::new(NetworkInfo::disconnected());

    for track in ["t1", "t2", "t3"] {
        reconciler.record_play(track, 200).await.unwrap();
    }
    assert_eq!(reconciler.unsynced_count().await.unwrap().play_history, 3);

    let mut sync_events = events.subscribe_channel(EventChannel::Sync);
    let cancel = CancellationToken::new();
    let watcher = ConnectivityWatcher::new(reconciler.clone(), Arc::new(network)).spawn(cancel.clone());

    changes
        .send(NetworkInfo::connected(Some(NetworkType::WiFi)))
        .unwrap();
    assert_eq!(wait_for_completed(&mut sync_events).await, (3, 0));
    assert_eq!(reconciler.unsynced_count().await.unwrap().total, 0);

    cancel.cancel();
    timeout(Duration::from_secs(5), watcher).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_syncs_at_start_and_only_on_transitions() {
    let catalog = Arc::new(CountingCatalog::default());
    let events = EventBus::new(64);
    let reconciler = reconciler_with(catalog.clone(), SyncConfig::default(), &events).await;
    let (network, changes) = ScriptedNetwork::new(NetworkInfo::connected(Some(NetworkType::Ethernet)));

    reconciler.record_like("t1").await.unwrap();

    let mut sync_events = events.subscribe_channel(EventChannel::Sync);
    let watcher =
        ConnectivityWatcher::new(reconciler.clone(), Arc::new(network)).spawn(CancellationToken::new());
    assert_eq!(wait_for_completed(&mut sync_events).await, (0, 1));

    // Still connected: not a transition
    reconciler.record_play("t2", 5).await.unwrap();
    changes
        .send(NetworkInfo::connected(Some(NetworkType::WiFi)))
        .unwrap();
    changes.send(NetworkInfo::disconnected()).unwrap();
    changes
        .send(NetworkInfo::connected(Some(NetworkType::WiFi)))
        .unwrap();
    assert_eq!(wait_for_completed(&mut sync_events).await, (1, 0));

    // Closing the change stream ends the watcher
    drop(changes);
    timeout(Duration::from_secs(5), watcher).await.unwrap().unwrap();
    assert_eq!(catalog.delivered.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_wifi_only_skips_metered_network() {
    let catalog = Arc::new(CountingCatalog::default());
    let events = EventBus::new(64);
    let reconciler = reconciler_with(
        catalog.clone(),
        SyncConfig::default().with_wifi_only(true),
        &events,
    )
    .await;
    let (network, changes) = ScriptedNetwork::new(NetworkInfo::disconnected());
    reconciler.record_play("t1", 5).await.unwrap();

    let mut sync_events = events.subscribe_channel(EventChannel::Sync);
    let watcher =
        ConnectivityWatcher::new(reconciler.clone(), Arc::new(network)).spawn(CancellationToken::new());

    changes.send(metered_cellular()).unwrap();
    changes.send(NetworkInfo::disconnected()).unwrap();
    changes
        .send(NetworkInfo::connected(Some(NetworkType::WiFi)))
        .unwrap();

    // Only the unmetered transition synced
    assert_eq!(wait_for_completed(&mut sync_events).await, (1, 0));
    drop(changes);
    timeout(Duration::from_secs(5), watcher).await.unwrap().unwrap();
    assert_eq!(catalog.delivered.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_overlapping_syncs_deliver_once() {
    let catalog = Arc::new(CountingCatalog::default());
    let events = EventBus::new(64);
    let reconciler = reconciler_with(catalog.clone(), SyncConfig::default(), &events).await;
    for i in 0..5 {
        reconciler.record_play(&format!("t{}", i), 1).await.unwrap();
    }

    let (first, second) = tokio::join!(reconciler.sync_all(), reconciler.sync_play_history());
    assert_eq!(first.unwrap().play_history + second.unwrap(), 5);
    assert_eq!(catalog.delivered.load(Ordering::SeqCst), 5);
}
