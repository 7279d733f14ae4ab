//! Connectivity-driven sync trigger
//!
//! Runs a full sync once at start when online, then on every transition into
//! `Connected`. With `wifi_only`, a metered link counts as offline. There is
//! no periodic polling.

use bridge_traits::network::NetworkMonitor;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::reconciler::SyncReconciler;

pub struct ConnectivityWatcher {
    reconciler: Arc<SyncReconciler>,
    monitor: Arc<dyn NetworkMonitor>,
}

impl ConnectivityWatcher {
    pub fn new(reconciler: Arc<SyncReconciler>, monitor: Arc<dyn NetworkMonitor>) -> Self {
        Self {
            reconciler,
            monitor,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Watch until `cancel` fires or the change stream closes.
    pub async fn run(self, cancel: CancellationToken) {
        // Subscribe before the initial check so no transition slips between
        let mut changes = match self.monitor.subscribe_changes().await {
            Ok(changes) => Some(changes),
            Err(e) => {
                warn!(error = %e, "Network change notifications unavailable");
                None
            }
        };

        let wifi_only = self.reconciler.config().wifi_only;
        let mut was_online = match self.monitor.get_network_info().await {
            Ok(info) => {
                let online = info.allows_sync(wifi_only);
                if online && self.reconciler.config().sync_on_start {
                    self.sync().await;
                }
                online
            }
            Err(e) => {
                warn!(error = %e, "Network status unavailable");
                false
            }
        };

        let Some(changes) = changes.as_mut() else {
            return;
        };

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => break,
                next = changes.next() => next,
            };

            let Some(info) = next else {
                debug!("Network change stream closed");
                break;
            };

            let online = info.allows_sync(wifi_only);
            if online && !was_online {
                info!(network_type = ?info.network_type, "Back online");
                self.sync().await;
            } else if info.is_connected() && !online {
                debug!("Metered network, deferring offline sync");
            }
            was_online = online;
        }

        debug!("Connectivity watcher stopped");
    }

    async fn sync(&self) {
        if let Err(e) = self.reconciler.sync_all().await {
            warn!(error = %e, "Offline sync failed");
        }
    }
}
