//! Host-owned key/value settings.

use crate::Result;
use async_trait::async_trait;
use sqlx::SqlitePool;

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<bool>;

    /// All pairs ordered by key
    async fn list(&self) -> Result<Vec<(String, String)>>;
}

pub struct SqliteSettingsRepository {
    pool: SqlitePool,
}

impl SqliteSettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for SqliteSettingsRepository {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self) -> Result<Vec<(String, String)>> {
        let pairs: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM settings ORDER BY key")
                .fetch_all(&self.pool)
                .await?;

        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    #[tokio::test]
    async fn test_settings_crud() {
        let repo = SqliteSettingsRepository::new(create_test_pool().await.unwrap());

        assert_eq!(repo.get("quality").await.unwrap(), None);

        repo.set("quality", "low").await.unwrap();
        repo.set("quality", "high").await.unwrap();
        repo.set("auto_download", "true").await.unwrap();

        assert_eq!(repo.get("quality").await.unwrap().as_deref(), Some("high"));
        assert_eq!(
            repo.list().await.unwrap(),
            vec![
                ("auto_download".to_string(), "true".to_string()),
                ("quality".to_string(), "high".to_string()),
            ]
        );

        assert!(repo.delete("quality").await.unwrap());
        assert!(!repo.delete("quality").await.unwrap());
    }
}
