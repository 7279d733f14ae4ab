//! SQLite pool setup for the offline store
//!
//! File databases run in WAL mode with foreign keys on. An in-memory database
//! only exists inside the connection that created it, so in-memory pools hold
//! exactly one connection for their whole life. Tables are created by
//! [`OfflineStore::initialize`], which [`open_store`] runs for you.

use crate::{OfflineStore, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

const IN_MEMORY_URL: &str = "sqlite::memory:";
const FILE_POOL_SIZE: u32 = 4;

/// Where the store lives and how long callers wait for a connection
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `sqlite:<path>` or `sqlite::memory:`
    pub database_url: String,
    /// Ignored for in-memory databases
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_url: format!("sqlite:{}", database_path.into().display()),
            max_connections: FILE_POOL_SIZE,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Private database that disappears with the pool
    pub fn in_memory() -> Self {
        Self {
            database_url: IN_MEMORY_URL.to_string(),
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url == IN_MEMORY_URL
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max.max(1);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Open the pool and check it answers
pub async fn create_pool(config: DatabaseConfig) -> Result<SqlitePool> {
    let in_memory = config.is_in_memory();
    let max_connections = if in_memory { 1 } else { config.max_connections };
    info!(
        database_url = %config.database_url,
        max_connections,
        "Opening offline store"
    );

    let options = SqliteConnectOptions::from_str(&config.database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true);

    let mut pool_options = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(max_connections)
        .acquire_timeout(config.acquire_timeout);
    if in_memory {
        // Recycling the connection would drop the database with it
        pool_options = pool_options.max_lifetime(None).idle_timeout(None);
    }

    let pool = pool_options.connect_with(options).await.map_err(|e| {
        warn!(error = %e, database_url = %config.database_url, "Failed to open offline store");
        e
    })?;

    health_check(&pool).await?;
    Ok(pool)
}

/// Open the pool and create every table in one step
pub async fn open_store(config: DatabaseConfig) -> Result<OfflineStore> {
    let pool = create_pool(config).await?;
    let store = OfflineStore::new(pool);
    store.initialize().await?;
    Ok(store)
}

/// In-memory pool with the full schema applied
pub async fn create_test_pool() -> Result<SqlitePool> {
    let store = open_store(DatabaseConfig::in_memory()).await?;
    Ok(store.pool().clone())
}

pub async fn health_check(pool: &SqlitePool) -> Result<()> {
    let value: i64 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    debug!(value, "Offline store answered health check");
    Ok(())
}
