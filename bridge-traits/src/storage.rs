//! Storage Quota Abstraction
//!
//! Advisory usage/quota figures from the host. These are for display only;
//! eviction decisions are made from the store's own byte accounting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Host-reported storage figures in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEstimate {
    pub usage: u64,
    pub quota: u64,
}

impl StorageEstimate {
    pub fn new(usage: u64, quota: u64) -> Self {
        Self { usage, quota }
    }

    /// Rounded percentage of quota in use. Zero when the quota is unknown.
    pub fn percent_used(&self) -> u8 {
        if self.quota == 0 {
            return 0;
        }
        let pct = (self.usage as f64 / self.quota as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    pub fn available(&self) -> u64 {
        self.quota.saturating_sub(self.usage)
    }
}

/// Storage quota trait
///
/// - **Desktop**: size of the application data directory against a configured quota
/// - **Web**: `navigator.storage.estimate()`
#[async_trait]
pub trait StorageQuota: Send + Sync {
    /// Current usage and quota as reported by the host
    async fn estimate(&self) -> Result<StorageEstimate>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_used() {
        assert_eq!(StorageEstimate::new(25, 100).percent_used(), 25);
        assert_eq!(StorageEstimate::new(1, 3).percent_used(), 33);
        assert_eq!(StorageEstimate::new(10, 0).percent_used(), 0);
        assert_eq!(StorageEstimate::new(200, 100).percent_used(), 100);
    }

    #[test]
    fn test_available_saturates() {
        assert_eq!(StorageEstimate::new(40, 100).available(), 60);
        assert_eq!(StorageEstimate::new(140, 100).available(), 0);
    }
}
