//! # Download Queue Repository
//!
//! FIFO persistence for download queue items. A partial unique index keeps at
//! most one pending or downloading item per track, so concurrent enqueues of
//! the same track resolve to a single row.

use crate::models::{DownloadQueueItem, QueueItemId, QueueStatus};
use crate::{Result, StoreError};
use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Insert a new item unless the track already has an active one
    ///
    /// Returns `true` if the row was inserted.
    async fn insert_if_absent(&self, item: &DownloadQueueItem) -> Result<bool>;

    async fn find(&self, id: &QueueItemId) -> Result<Option<DownloadQueueItem>>;

    /// The pending or downloading item for `track_id`, if any
    async fn find_active_by_track(&self, track_id: &str) -> Result<Option<DownloadQueueItem>>;

    /// Oldest pending item by `added_at`, then insertion order
    async fn next_pending(&self) -> Result<Option<DownloadQueueItem>>;

    /// Move an item from pending to downloading. Returns false if it was not pending.
    async fn claim(&self, id: &QueueItemId) -> Result<bool>;

    /// Only applies to downloading items
    async fn update_progress(&self, id: &QueueItemId, progress: u8) -> Result<bool>;

    /// downloading → completed with progress 100
    async fn mark_completed(&self, id: &QueueItemId, completed_at: i64) -> Result<bool>;

    /// downloading → failed
    async fn mark_failed(&self, id: &QueueItemId, error: &str) -> Result<bool>;

    /// Every item ordered by `added_at`
    async fn list(&self) -> Result<Vec<DownloadQueueItem>>;

    /// Delete the active item for `track_id`, returning it
    async fn remove_active_by_track(&self, track_id: &str) -> Result<Option<DownloadQueueItem>>;

    /// failed → pending with progress and error cleared
    ///
    /// A failed item whose track already has an active item, or has since
    /// been downloaded, stays failed.
    async fn reset_failed(&self) -> Result<u64>;

    /// downloading → pending, for items orphaned by a previous process
    async fn reset_interrupted(&self) -> Result<u64>;

    /// Delete completed and failed items
    async fn delete_terminal(&self) -> Result<u64>;

    async fn count_by_statuses(&self, statuses: &[QueueStatus]) -> Result<u64>;

    async fn downloading_track_ids(&self) -> Result<Vec<String>>;

    async fn clear(&self) -> Result<u64>;
}

pub struct SqliteQueueRepository {
    pool: SqlitePool,
}

impl SqliteQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS download_queue (
                id TEXT PRIMARY KEY NOT NULL,
                track_id TEXT NOT NULL,
                title TEXT NOT NULL,
                artist_name TEXT NOT NULL,
                cover_art_url TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                progress INTEGER NOT NULL DEFAULT 0,
                error TEXT,
                added_at INTEGER NOT NULL,
                completed_at INTEGER,
                CONSTRAINT download_queue_status_check CHECK (
                    status IN ('pending', 'downloading', 'completed', 'failed')
                ),
                CONSTRAINT download_queue_progress_check CHECK (
                    progress BETWEEN 0 AND 100
                )
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_download_queue_active_track
            ON download_queue(track_id)
            WHERE status IN ('pending', 'downloading')
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_download_queue_status_added
            ON download_queue(status, added_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct QueueItemRow {
    id: String,
    track_id: String,
    title: String,
    artist_name: String,
    cover_art_url: Option<String>,
    status: String,
    progress: i64,
    error: Option<String>,
    added_at: i64,
    completed_at: Option<i64>,
}

impl TryFrom<QueueItemRow> for DownloadQueueItem {
    type Error = StoreError;

    fn try_from(row: QueueItemRow) -> Result<Self> {
        Ok(DownloadQueueItem {
            id: QueueItemId::from_string(&row.id)?,
            track_id: row.track_id,
            title: row.title,
            artist_name: row.artist_name,
            cover_art_url: row.cover_art_url,
            status: row.status.parse()?,
            progress: row.progress.clamp(0, 100) as u8,
            error: row.error,
            added_at: row.added_at,
            completed_at: row.completed_at,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, track_id, title, artist_name, cover_art_url, status,
           progress, error, added_at, completed_at
    FROM download_queue
"#;

#[async_trait]
impl QueueRepository for SqliteQueueRepository {
    async fn insert_if_absent(&self, item: &DownloadQueueItem) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO download_queue (
                id, track_id, title, artist_name, cover_art_url, status,
                progress, error, added_at, completed_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.as_str())
        .bind(&item.track_id)
        .bind(&item.title)
        .bind(&item.artist_name)
        .bind(&item.cover_art_url)
        .bind(item.status.as_str())
        .bind(item.progress as i64)
        .bind(&item.error)
        .bind(item.added_at)
        .bind(item.completed_at)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        debug!(track_id = %item.track_id, inserted, "Queue insert");
        Ok(inserted)
    }

    async fn find(&self, id: &QueueItemId) -> Result<Option<DownloadQueueItem>> {
        let row = sqlx::query_as::<_, QueueItemRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(DownloadQueueItem::try_from).transpose()
    }

    async fn find_active_by_track(&self, track_id: &str) -> Result<Option<DownloadQueueItem>> {
        let row = sqlx::query_as::<_, QueueItemRow>(&format!(
            "{} WHERE track_id = ? AND status IN ('pending', 'downloading')",
            SELECT_COLUMNS
        ))
        .bind(track_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DownloadQueueItem::try_from).transpose()
    }

    async fn next_pending(&self) -> Result<Option<DownloadQueueItem>> {
        let row = sqlx::query_as::<_, QueueItemRow>(&format!(
            "{} WHERE status = 'pending' ORDER BY added_at ASC, rowid ASC LIMIT 1",
            SELECT_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;

        row.map(DownloadQueueItem::try_from).transpose()
    }

    async fn claim(&self, id: &QueueItemId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE download_queue SET status = 'downloading' WHERE id = ? AND status = 'pending'",
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_progress(&self, id: &QueueItemId, progress: u8) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE download_queue SET progress = ? WHERE id = ? AND status = 'downloading'",
        )
        .bind(progress.min(100) as i64)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_completed(&self, id: &QueueItemId, completed_at: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE download_queue
            SET status = 'completed', progress = 100, error = NULL, completed_at = ?
            WHERE id = ? AND status = 'downloading'
            "#,
        )
        .bind(completed_at)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: &QueueItemId, error: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE download_queue
            SET status = 'failed', error = ?
            WHERE id = ? AND status = 'downloading'
            "#,
        )
        .bind(error)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<DownloadQueueItem>> {
        let rows = sqlx::query_as::<_, QueueItemRow>(&format!(
            "{} ORDER BY added_at ASC, rowid ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(DownloadQueueItem::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn remove_active_by_track(&self, track_id: &str) -> Result<Option<DownloadQueueItem>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, QueueItemRow>(&format!(
            "{} WHERE track_id = ? AND status IN ('pending', 'downloading')",
            SELECT_COLUMNS
        ))
        .bind(track_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM download_queue WHERE id = ?")
            .bind(&row.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        DownloadQueueItem::try_from(row).map(Some)
    }

    async fn reset_failed(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE OR IGNORE download_queue
            SET status = 'pending', progress = 0, error = NULL, completed_at = NULL
            WHERE status = 'failed'
              AND track_id NOT IN (SELECT id FROM downloaded_tracks)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn reset_interrupted(&self) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE download_queue SET status = 'pending', progress = 0 WHERE status = 'downloading'",
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn delete_terminal(&self) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM download_queue WHERE status IN ('completed', 'failed')")
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn count_by_statuses(&self, statuses: &[QueueStatus]) -> Result<u64> {
        if statuses.is_empty() {
            return Ok(0);
        }

        let mut builder =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM download_queue WHERE status IN (");
        let mut separated = builder.separated(", ");
        for status in statuses {
            separated.push_bind(status.as_str());
        }
        separated.push_unseparated(")");

        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn downloading_track_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT track_id FROM download_queue WHERE status = 'downloading'")
                .fetch_all(&self.pool)
                .await?;

        Ok(ids)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM download_queue")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
