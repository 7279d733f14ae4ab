//! # Offline Store
//!
//! SQLite persistence for the offline cache: downloaded tracks and their
//! payloads, the download queue, cached cover art, buffered offline actions
//! and host settings.
//!
//! ```rust,ignore
//! use core_store::db::{open_store, DatabaseConfig};
//!
//! let store = open_store(DatabaseConfig::new("offline.db")).await?;
//! let used = store.downloads().total_payload_size().await?;
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::{Result, StoreError};
pub use models::{
    ActionId, CachedCoverArt, DownloadQueueItem, DownloadedTrack, OfflineLike, OfflinePlay,
    QueueItemId, QueueStatus,
};
pub use repositories::{
    CoverArtRepository, DownloadRepository, LikedTrackRepository, PlayHistoryRepository,
    QueueRepository, SettingsRepository, SqliteCoverArtRepository, SqliteDownloadRepository,
    SqliteLikedTrackRepository, SqlitePlayHistoryRepository, SqliteQueueRepository,
    SqliteSettingsRepository,
};

use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

/// Every repository over one shared pool
#[derive(Clone)]
pub struct OfflineStore {
    pool: SqlitePool,
    downloads: Arc<dyn DownloadRepository>,
    queue: Arc<dyn QueueRepository>,
    covers: Arc<dyn CoverArtRepository>,
    plays: Arc<dyn PlayHistoryRepository>,
    likes: Arc<dyn LikedTrackRepository>,
    settings: Arc<dyn SettingsRepository>,
}

impl OfflineStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            downloads: Arc::new(SqliteDownloadRepository::new(pool.clone())),
            queue: Arc::new(SqliteQueueRepository::new(pool.clone())),
            covers: Arc::new(SqliteCoverArtRepository::new(pool.clone())),
            plays: Arc::new(SqlitePlayHistoryRepository::new(pool.clone())),
            likes: Arc::new(SqliteLikedTrackRepository::new(pool.clone())),
            settings: Arc::new(SqliteSettingsRepository::new(pool.clone())),
            pool,
        }
    }

    /// Create every table and index that does not exist yet
    pub async fn initialize(&self) -> Result<()> {
        SqliteDownloadRepository::new(self.pool.clone())
            .initialize()
            .await?;
        SqliteQueueRepository::new(self.pool.clone())
            .initialize()
            .await?;
        SqliteCoverArtRepository::new(self.pool.clone())
            .initialize()
            .await?;
        SqlitePlayHistoryRepository::new(self.pool.clone())
            .initialize()
            .await?;
        SqliteLikedTrackRepository::new(self.pool.clone())
            .initialize()
            .await?;
        SqliteSettingsRepository::new(self.pool.clone())
            .initialize()
            .await?;

        info!("Offline store schema ready");
        Ok(())
    }

    /// Remove all offline content in one transaction. Settings are kept.
    pub async fn clear_offline_data(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for table in [
            "downloaded_tracks",
            "track_payloads",
            "download_queue",
            "cover_art",
            "offline_play_history",
            "offline_liked_tracks",
        ] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!("Cleared all offline data");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn downloads(&self) -> &Arc<dyn DownloadRepository> {
        &self.downloads
    }

    pub fn queue(&self) -> &Arc<dyn QueueRepository> {
        &self.queue
    }

    pub fn covers(&self) -> &Arc<dyn CoverArtRepository> {
        &self.covers
    }

    pub fn plays(&self) -> &Arc<dyn PlayHistoryRepository> {
        &self.plays
    }

    pub fn likes(&self) -> &Arc<dyn LikedTrackRepository> {
        &self.likes
    }

    pub fn settings(&self) -> &Arc<dyn SettingsRepository> {
        &self.settings
    }
}
