//! # Offline Liked Track Repository
//!
//! Like and unlike actions buffered for delivery, in `liked_at` order.

use crate::models::{ActionId, OfflineLike};
use crate::{Result, StoreError};
use async_trait::async_trait;
use bridge_traits::catalog::LikeAction;
use sqlx::{FromRow, SqlitePool};

#[async_trait]
pub trait LikedTrackRepository: Send + Sync {
    async fn insert(&self, like: &OfflineLike) -> Result<()>;

    /// Unsynced actions ordered by `liked_at`
    async fn unsynced(&self) -> Result<Vec<OfflineLike>>;

    async fn mark_synced(&self, id: &ActionId) -> Result<bool>;

    async fn count_unsynced(&self) -> Result<u64>;

    /// Delete synced actions with `liked_at < cutoff`
    async fn delete_synced_before(&self, cutoff: i64) -> Result<u64>;

    async fn clear(&self) -> Result<u64>;
}

pub struct SqliteLikedTrackRepository {
    pool: SqlitePool,
}

impl SqliteLikedTrackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offline_liked_tracks (
                id TEXT PRIMARY KEY NOT NULL,
                track_id TEXT NOT NULL,
                liked_at INTEGER NOT NULL,
                action TEXT NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0,
                CONSTRAINT offline_liked_tracks_action_check CHECK (
                    action IN ('like', 'unlike')
                )
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_offline_liked_tracks_synced
            ON offline_liked_tracks(synced, liked_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct OfflineLikeRow {
    id: String,
    track_id: String,
    liked_at: i64,
    action: String,
    synced: bool,
}

impl TryFrom<OfflineLikeRow> for OfflineLike {
    type Error = StoreError;

    fn try_from(row: OfflineLikeRow) -> Result<Self> {
        let action: LikeAction = row
            .action
            .parse()
            .map_err(|_| StoreError::InvalidData(format!("Unknown like action: {}", row.action)))?;

        Ok(OfflineLike {
            id: ActionId::from_string(&row.id)?,
            track_id: row.track_id,
            liked_at: row.liked_at,
            action,
            synced: row.synced,
        })
    }
}

#[async_trait]
impl LikedTrackRepository for SqliteLikedTrackRepository {
    async fn insert(&self, like: &OfflineLike) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO offline_liked_tracks (id, track_id, liked_at, action, synced)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(like.id.as_str())
        .bind(&like.track_id)
        .bind(like.liked_at)
        .bind(like.action.as_str())
        .bind(like.synced)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unsynced(&self) -> Result<Vec<OfflineLike>> {
        let rows = sqlx::query_as::<_, OfflineLikeRow>(
            r#"
            SELECT id, track_id, liked_at, action, synced
            FROM offline_liked_tracks
            WHERE synced = 0
            ORDER BY liked_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(OfflineLike::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn mark_synced(&self, id: &ActionId) -> Result<bool> {
        let result = sqlx::query("UPDATE offline_liked_tracks SET synced = 1 WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_unsynced(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM offline_liked_tracks WHERE synced = 0")
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    async fn delete_synced_before(&self, cutoff: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM offline_liked_tracks WHERE synced = 1 AND liked_at < ?")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM offline_liked_tracks")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_like_lifecycle() {
        let repo = SqliteLikedTrackRepository::new(create_test_pool().await.unwrap());
        let unlike = OfflineLike::new("t1", 20, LikeAction::Unlike);
        let like = OfflineLike::new("t1", 10, LikeAction::Like);
        repo.insert(&unlike).await.unwrap();
        repo.insert(&like).await.unwrap();

        let pending = repo.unsynced().await.unwrap();
        assert_eq!(pending, vec![like.clone(), unlike.clone()]);

        assert!(repo.mark_synced(&like.id).await.unwrap());
        assert_eq!(repo.count_unsynced().await.unwrap(), 1);
        assert_eq!(repo.unsynced().await.unwrap()[0].action, LikeAction::Unlike);

        assert_eq!(repo.delete_synced_before(15).await.unwrap(), 1);
        assert_eq!(repo.delete_synced_before(15).await.unwrap(), 0);
    }
}
