//! # Storage Eviction
//!
//! Frees space by deleting downloaded tracks, least recently played first.
//!
//! The authority for eviction is the sum of stored payload sizes. The host
//! [`StorageQuota`] estimate is advisory and only used for display.

use bridge_traits::storage::{StorageEstimate, StorageQuota};
use core_store::OfflineStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::Result;
use crate::stats::{StorageInfo, StorageStats};

/// Storage accounting and least-recently-played eviction
#[derive(Clone)]
pub struct StorageManager {
    store: OfflineStore,
    quota: Option<Arc<dyn StorageQuota>>,
    budget_bytes: Option<u64>,
}

impl StorageManager {
    pub fn new(
        store: OfflineStore,
        quota: Option<Arc<dyn StorageQuota>>,
        budget_bytes: Option<u64>,
    ) -> Self {
        Self {
            store,
            quota,
            budget_bytes,
        }
    }

    pub fn budget_bytes(&self) -> Option<u64> {
        self.budget_bytes
    }

    /// Sum of stored payload sizes
    pub async fn storage_used(&self) -> Result<u64> {
        Ok(self.store.downloads().total_payload_size().await?)
    }

    pub async fn storage_stats(&self) -> Result<StorageStats> {
        Ok(StorageStats {
            track_count: self.store.downloads().count().await?,
            used_bytes: self.storage_used().await?,
            budget_bytes: self.budget_bytes,
        })
    }

    /// Host estimate, or zeros when no quota bridge is configured or it fails
    pub async fn storage_estimate(&self) -> StorageEstimate {
        let Some(quota) = &self.quota else {
            return StorageEstimate::default();
        };

        match quota.estimate().await {
            Ok(estimate) => estimate,
            Err(e) => {
                warn!(error = %e, "Storage estimate unavailable");
                StorageEstimate::default()
            }
        }
    }

    pub async fn storage_info(&self) -> StorageInfo {
        StorageInfo::from(self.storage_estimate().await)
    }

    /// Evict until at most `target_bytes` are used. Returns the bytes freed.
    ///
    /// Tracks that are currently downloading are never evicted, so the result
    /// can fall short of the target.
    #[instrument(skip(self))]
    pub async fn cleanup(&self, target_bytes: u64) -> Result<u64> {
        let used = self.storage_used().await?;
        if used <= target_bytes {
            debug!(used, "Within target, nothing to evict");
            return Ok(0);
        }

        let to_free = used - target_bytes;
        let downloading = self.store.queue().downloading_track_ids().await?;
        let candidates = self
            .store
            .downloads()
            .eviction_candidates(&downloading)
            .await?;

        info!(to_free, candidates = candidates.len(), "Evicting downloads");

        let mut freed = 0u64;
        let mut evicted = 0usize;
        for track in candidates {
            if freed >= to_free {
                break;
            }

            if let Some(size) = self.store.downloads().delete(&track.id).await? {
                debug!(track_id = %track.id, size, "Evicted track");
                freed += size;
                evicted += 1;
            }
        }

        if freed < to_free {
            warn!(freed, to_free, "Eviction target not reached");
        }
        info!(freed, evicted, "Eviction finished");
        Ok(freed)
    }

    /// `cleanup` down to the configured budget, or 0 without one
    pub async fn enforce_budget(&self) -> Result<u64> {
        match self.budget_bytes {
            Some(budget) => self.cleanup(budget).await,
            None => Ok(0),
        }
    }
}
