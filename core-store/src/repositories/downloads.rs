//! # Downloaded Track Repository
//!
//! Metadata rows live in `downloaded_tracks`; payload bytes live in
//! `track_payloads` keyed by the same track id. Both are written and deleted
//! inside one transaction so a metadata row never exists without its payload.

use crate::models::DownloadedTrack;
use crate::{Result, StoreError};
use async_trait::async_trait;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

#[async_trait]
pub trait DownloadRepository: Send + Sync {
    /// Insert or replace a track together with its payload
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if `track.payload_size` does not match the payload.
    async fn insert(&self, track: &DownloadedTrack, payload: &[u8]) -> Result<()>;

    async fn find(&self, id: &str) -> Result<Option<DownloadedTrack>>;

    async fn exists(&self, id: &str) -> Result<bool>;

    async fn payload(&self, id: &str) -> Result<Option<Vec<u8>>>;

    /// All tracks, newest download first
    async fn list_recent(&self) -> Result<Vec<DownloadedTrack>>;

    async fn list_ids(&self) -> Result<Vec<String>>;

    async fn count(&self) -> Result<u64>;

    /// Sum of `payload_size` over every track
    async fn total_payload_size(&self) -> Result<u64>;

    /// Set `last_played_at` and bump `play_count`. Returns false if absent.
    async fn record_play(&self, id: &str, played_at: i64) -> Result<bool>;

    /// Delete a track and its payload, returning the bytes freed
    async fn delete(&self, id: &str) -> Result<Option<u64>>;

    /// Eviction order: never played first, then least recently played,
    /// then oldest download. `excluded_ids` are skipped.
    async fn eviction_candidates(&self, excluded_ids: &[String]) -> Result<Vec<DownloadedTrack>>;

    async fn clear(&self) -> Result<u64>;
}

pub struct SqliteDownloadRepository {
    pool: SqlitePool,
}

impl SqliteDownloadRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS track_payloads (
                track_id TEXT PRIMARY KEY NOT NULL,
                data BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloaded_tracks (
                id TEXT PRIMARY KEY NOT NULL
                    REFERENCES track_payloads(track_id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                artist_id TEXT NOT NULL DEFAULT '',
                artist_name TEXT NOT NULL,
                album_id TEXT,
                album_title TEXT,
                cover_art_url TEXT,
                duration_ms INTEGER NOT NULL DEFAULT 0,
                genres TEXT NOT NULL DEFAULT '[]',
                payload_size INTEGER NOT NULL,
                downloaded_at INTEGER NOT NULL,
                last_played_at INTEGER,
                play_count INTEGER NOT NULL DEFAULT 0
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_downloaded_tracks_eviction
            ON downloaded_tracks(last_played_at, downloaded_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_downloaded_tracks_downloaded_at
            ON downloaded_tracks(downloaded_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct DownloadedTrackRow {
    id: String,
    title: String,
    artist_id: String,
    artist_name: String,
    album_id: Option<String>,
    album_title: Option<String>,
    cover_art_url: Option<String>,
    duration_ms: i64,
    genres: String,
    payload_size: i64,
    downloaded_at: i64,
    last_played_at: Option<i64>,
    play_count: i64,
}

impl TryFrom<DownloadedTrackRow> for DownloadedTrack {
    type Error = StoreError;

    fn try_from(row: DownloadedTrackRow) -> Result<Self> {
        let genres: Vec<String> = serde_json::from_str(&row.genres)?;

        Ok(DownloadedTrack {
            id: row.id,
            title: row.title,
            artist_id: row.artist_id,
            artist_name: row.artist_name,
            album_id: row.album_id,
            album_title: row.album_title,
            cover_art_url: row.cover_art_url,
            duration_ms: row.duration_ms.max(0) as u64,
            genres,
            payload_size: row.payload_size.max(0) as u64,
            downloaded_at: row.downloaded_at,
            last_played_at: row.last_played_at,
            play_count: row.play_count.max(0) as u32,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, title, artist_id, artist_name, album_id, album_title, cover_art_url,
           duration_ms, genres, payload_size, downloaded_at, last_played_at, play_count
    FROM downloaded_tracks
"#;

#[async_trait]
impl DownloadRepository for SqliteDownloadRepository {
    async fn insert(&self, track: &DownloadedTrack, payload: &[u8]) -> Result<()> {
        if track.payload_size != payload.len() as u64 {
            return Err(StoreError::InvalidData(format!(
                "payload_size {} does not match payload length {} for track {}",
                track.payload_size,
                payload.len(),
                track.id
            )));
        }

        let genres = serde_json::to_string(&track.genres)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO track_payloads (track_id, data) VALUES (?, ?)
            ON CONFLICT(track_id) DO UPDATE SET data = excluded.data
            "#,
        )
        .bind(&track.id)
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO downloaded_tracks (
                id, title, artist_id, artist_name, album_id, album_title, cover_art_url,
                duration_ms, genres, payload_size, downloaded_at, last_played_at, play_count
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist_id = excluded.artist_id,
                artist_name = excluded.artist_name,
                album_id = excluded.album_id,
                album_title = excluded.album_title,
                cover_art_url = excluded.cover_art_url,
                duration_ms = excluded.duration_ms,
                genres = excluded.genres,
                payload_size = excluded.payload_size,
                downloaded_at = excluded.downloaded_at,
                last_played_at = excluded.last_played_at,
                play_count = excluded.play_count
            "#,
        )
        .bind(&track.id)
        .bind(&track.title)
        .bind(&track.artist_id)
        .bind(&track.artist_name)
        .bind(&track.album_id)
        .bind(&track.album_title)
        .bind(&track.cover_art_url)
        .bind(track.duration_ms as i64)
        .bind(genres)
        .bind(track.payload_size as i64)
        .bind(track.downloaded_at)
        .bind(track.last_played_at)
        .bind(track.play_count as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(track_id = %track.id, bytes = track.payload_size, "Stored downloaded track");
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<DownloadedTrack>> {
        let row = sqlx::query_as::<_, DownloadedTrackRow>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(DownloadedTrack::try_from).transpose()
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM downloaded_tracks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn payload(&self, id: &str) -> Result<Option<Vec<u8>>> {
        let data: Option<Vec<u8>> = sqlx::query_scalar(
            r#"
            SELECT p.data FROM track_payloads p
            JOIN downloaded_tracks t ON t.id = p.track_id
            WHERE p.track_id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(data)
    }

    async fn list_recent(&self) -> Result<Vec<DownloadedTrack>> {
        let rows = sqlx::query_as::<_, DownloadedTrackRow>(&format!(
            "{} ORDER BY downloaded_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(DownloadedTrack::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar("SELECT id FROM downloaded_tracks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM downloaded_tracks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count as u64)
    }

    async fn total_payload_size(&self) -> Result<u64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(payload_size), 0) FROM downloaded_tracks")
                .fetch_one(&self.pool)
                .await?;

        Ok(total.max(0) as u64)
    }

    async fn record_play(&self, id: &str, played_at: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE downloaded_tracks
            SET last_played_at = ?, play_count = play_count + 1
            WHERE id = ?
            "#,
        )
        .bind(played_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<Option<u64>> {
        let mut tx = self.pool.begin().await?;

        let size: Option<i64> =
            sqlx::query_scalar("SELECT payload_size FROM downloaded_tracks WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(size) = size else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM downloaded_tracks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM track_payloads WHERE track_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(track_id = %id, bytes = size, "Deleted downloaded track");
        Ok(Some(size.max(0) as u64))
    }

    async fn eviction_candidates(&self, excluded_ids: &[String]) -> Result<Vec<DownloadedTrack>> {
        let mut builder = QueryBuilder::<Sqlite>::new(SELECT_COLUMNS);

        if !excluded_ids.is_empty() {
            builder.push(" WHERE id NOT IN (");
            let mut separated = builder.separated(", ");
            for id in excluded_ids {
                separated.push_bind(id.as_str());
            }
            separated.push_unseparated(")");
        }

        builder.push(
            " ORDER BY last_played_at IS NOT NULL, last_played_at ASC, downloaded_at ASC, rowid ASC",
        );

        let rows = builder
            .build_query_as::<DownloadedTrackRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(DownloadedTrack::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn clear(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM downloaded_tracks")
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM track_payloads")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
