//! Cover art cache keyed by image URL.

use crate::models::CachedCoverArt;
use crate::Result;
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};

#[async_trait]
pub trait CoverArtRepository: Send + Sync {
    /// Insert or replace the image stored for `url`
    async fn put(&self, url: &str, data: &[u8], cached_at: i64) -> Result<()>;

    async fn get(&self, url: &str) -> Result<Option<CachedCoverArt>>;

    async fn contains(&self, url: &str) -> Result<bool>;

    async fn delete(&self, url: &str) -> Result<bool>;

    async fn clear(&self) -> Result<u64>;
}

pub struct SqliteCoverArtRepository {
    pool: SqlitePool,
}

impl SqliteCoverArtRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cover_art (
                url TEXT PRIMARY KEY NOT NULL,
                data BLOB NOT NULL,
                cached_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct CoverArtRow {
    url: String,
    data: Vec<u8>,
    cached_at: i64,
}

impl From<CoverArtRow> for CachedCoverArt {
    fn from(row: CoverArtRow) -> Self {
        CachedCoverArt {
            url: row.url,
            data: row.data,
            cached_at: row.cached_at,
        }
    }
}

#[async_trait]
impl CoverArtRepository for SqliteCoverArtRepository {
    async fn put(&self, url: &str, data: &[u8], cached_at: i64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO cover_art (url, data, cached_at) VALUES (?, ?, ?)")
            .bind(url)
            .bind(data)
            .bind(cached_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<CachedCoverArt>> {
        let row = sqlx::query_as::<_, CoverArtRow>(
            "SELECT url, data, cached_at FROM cover_art WHERE url = ?",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CachedCoverArt::from))
    }

    async fn contains(&self, url: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM cover_art WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn delete(&self, url: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cover_art WHERE url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cover_art")
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
    async fn test_cover_art_cache() {
        let repo = SqliteCoverArtRepository::new(create_test_pool().await.unwrap());
        let url = "https://cdn.example.com/cover.jpg";

        assert!(repo.get(url).await.unwrap().is_none());
        assert!(!repo.contains(url).await.unwrap());

        repo.put(url, &[0xFF, 0xD8], 10).await.unwrap();
        repo.put(url, &[0xFF, 0xD8, 0xFF], 20).await.unwrap();

        let cached = repo.get(url).await.unwrap().unwrap();
        assert_eq!(cached.data, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(cached.cached_at, 20);
        assert!(repo.contains(url).await.unwrap());

        assert!(repo.delete(url).await.unwrap());
        assert!(!repo.delete(url).await.unwrap());
    }
}
