//! Storage Quota Implementation
//!
//! Reports the size of the application data directory against a quota
//! supplied by the host.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{StorageEstimate, StorageQuota},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Desktop storage quota
///
/// `usage` is the recursive size of `root`; `quota` is the configured ceiling.
pub struct DesktopStorageQuota {
    root: PathBuf,
    quota: u64,
}

impl DesktopStorageQuota {
    /// Use the platform data directory (`<data_dir>/offline-cache-core`).
    pub fn new(quota: u64) -> Self {
        let root = dirs::data_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".local")
                    .join("share")
            })
            .join("offline-cache-core");

        Self::with_root(root, quota)
    }

    pub fn with_root(root: impl Into<PathBuf>, quota: u64) -> Self {
        Self {
            root: root.into(),
            quota,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn directory_size(path: &Path) -> Result<u64> {
        let mut total = 0u64;
        let mut pending = vec![path.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(BridgeError::Io(e)),
            };

            while let Some(entry) = entries.next_entry().await? {
                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    pending.push(entry.path());
                } else {
                    total += metadata.len();
                }
            }
        }

        Ok(total)
    }
}

#[async_trait]
impl StorageQuota for DesktopStorageQuota {
    async fn estimate(&self) -> Result<StorageEstimate> {
        let usage = Self::directory_size(&self.root).await?;
        debug!(root = ?self.root, usage, quota = self.quota, "Calculated storage estimate");
        Ok(StorageEstimate::new(usage, self.quota))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[tokio::test]
    async fn test_missing_directory_reports_zero() {
        let quota = DesktopStorageQuota::with_root(
            env::temp_dir().join("offline-cache-quota-does-not-exist"),
            1024,
        );

        let estimate = quota.estimate().await.unwrap();
        assert_eq!(estimate, StorageEstimate::new(0, 1024));
    }

    #[tokio::test]
    async fn test_nested_directory_size() {
        let root = env::temp_dir().join(format!("offline-cache-quota-{}", std::process::id()));
        let nested = root.join("covers");
        fs::create_dir_all(&nested).await.unwrap();
        fs::write(root.join("a.bin"), vec![0u8; 100]).await.unwrap();
        fs::write(nested.join("b.bin"), vec![0u8; 50]).await.unwrap();

        let estimate = DesktopStorageQuota::with_root(&root, 1000)
            .estimate()
            .await
            .unwrap();

        assert_eq!(estimate.usage, 150);
        assert_eq!(estimate.percent_used(), 15);

        fs::remove_dir_all(&root).await.unwrap();
    }
}
