//! # Offline Play History Repository
//!
//! Plays are appended unconditionally and only ever mutated to flip `synced`.

use crate::models::{ActionId, OfflinePlay};
use crate::{Result, StoreError};
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

#[async_trait]
pub trait PlayHistoryRepository: Send + Sync {
    async fn insert(&self, play: &OfflinePlay) -> Result<()>;

    /// Unsynced plays ordered by `played_at`
    async fn unsynced(&self) -> Result<Vec<OfflinePlay>>;

    async fn mark_synced(&self, id: &ActionId) -> Result<bool>;

    async fn count_unsynced(&self) -> Result<u64>;

    /// Delete synced plays with `played_at < cutoff`
    async fn delete_synced_before(&self, cutoff: i64) -> Result<u64>;

    async fn clear(&self) -> Result<u64>;
}

pub struct SqlitePlayHistoryRepository {
    pool: SqlitePool,
}

impl SqlitePlayHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS offline_play_history (
                id TEXT PRIMARY KEY NOT NULL,
                track_id TEXT NOT NULL,
                played_at INTEGER NOT NULL,
                duration_played INTEGER NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_offline_play_history_synced
            ON offline_play_history(synced, played_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct OfflinePlayRow {
    id: String,
    track_id: String,
    played_at: i64,
    duration_played: i64,
    synced: bool,
}

impl TryFrom<OfflinePlayRow> for OfflinePlay {
    type Error = StoreError;

    fn try_from(row: OfflinePlayRow) -> Result<Self> {
        Ok(OfflinePlay {
            id: ActionId::from_string(&row.id)?,
            track_id: row.track_id,
            played_at: row.played_at,
            duration_played: u32::try_from(row.duration_played).map_err(|_| {
                StoreError::InvalidData(format!(
                    "Invalid duration_played {} for play {}",
                    row.duration_played, row.id
                ))
            })?,
            synced: row.synced,
        })
    }
}

#[async_trait]
impl PlayHistoryRepository for SqlitePlayHistoryRepository {
    async fn insert(&self, play: &OfflinePlay) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO offline_play_history (id, track_id, played_at, duration_played, synced)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(play.id.as_str())
        .bind(&play.track_id)
        .bind(play.played_at)
        .bind(play.duration_played as i64)
        .bind(play.synced)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn unsynced(&self) -> Result<Vec<OfflinePlay>> {
        let rows = sqlx::query_as::<_, OfflinePlayRow>(
            r#"
            SELECT id, track_id, played_at, duration_played, synced
            FROM offline_play_history
            WHERE synced = 0
            ORDER BY played_at ASC, rowid ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(OfflinePlay::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn mark_synced(&self, id: &ActionId) -> Result<bool> {
        let result = sqlx::query("UPDATE offline_play_history SET synced = 1 WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_unsynced(&self) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM offline_play_history WHERE synced = 0")
                .fetch_one(&self.pool)
                .await?;

        Ok(count as u64)
    }

    async fn delete_synced_before(&self, cutoff: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM offline_play_history WHERE synced = 1 AND played_at < ?")
                .bind(cutoff)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM offline_play_history")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    async fn repository() -> SqlitePlayHistoryRepository {
        SqlitePlayHistoryRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_unsynced_ordered_by_played_at() {
        let repo = repository().await;
        let later = OfflinePlay::new("t2", 200, 30);
        let earlier = OfflinePlay::new("t1", 100, 45);
        repo.insert(&later).await.unwrap();
        repo.insert(&earlier).await.unwrap();

        let unsynced = repo.unsynced().await.unwrap();
        assert_eq!(unsynced, vec![earlier, later]);
        assert_eq!(repo.count_unsynced().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_synced() {
        let repo = repository().await;
        let play = OfflinePlay::new("t1", 100, 30);
        repo.insert(&play).await.unwrap();

        assert!(repo.mark_synced(&play.id).await.unwrap());
        assert!(!repo.mark_synced(&ActionId::new()).await.unwrap());
        assert!(repo.unsynced().await.unwrap().is_empty());
        assert_eq!(repo.count_unsynced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_synced_before_keeps_unsynced() {
        let repo = repository().await;
        let old_synced = OfflinePlay::new("a", 100, 1);
        let old_unsynced = OfflinePlay::new("b", 100, 1);
        let new_synced = OfflinePlay::new("c", 1_000, 1);
        for play in [&old_synced, &old_unsynced, &new_synced] {
            repo.insert(play).await.unwrap();
        }
        repo.mark_synced(&old_synced.id).await.unwrap();
        repo.mark_synced(&new_synced.id).await.unwrap();

        assert_eq!(repo.delete_synced_before(500).await.unwrap(), 1);
        assert_eq!(repo.count_unsynced().await.unwrap(), 1);
        assert_eq!(repo.delete_synced_before(i64::MAX).await.unwrap(), 1);
        assert_eq!(repo.clear().await.unwrap(), 1);
    }
}
