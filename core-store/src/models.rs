//! # Store Models
//!
//! Records persisted by the offline store. All timestamps are Unix epoch
//! milliseconds.
//!
//! ## Queue state machine
//!
//! ```text
//! Pending → Downloading → Completed
//!    ↑           ↓
//!    └──────── Failed
//! ```

use bridge_traits::catalog::LikeAction;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::{Result, StoreError};

// ============================================================================
// ID Types
// ============================================================================

/// Surrogate key of a download queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItemId(Uuid);

impl QueueItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StoreError::InvalidData(format!("Invalid queue item id {}: {}", s, e)))
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for QueueItemId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Identifier of a buffered offline action
///
/// Doubles as the idempotency key when the action is delivered remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(Uuid);

impl ActionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| StoreError::InvalidData(format!("Invalid action id {}: {}", s, e)))
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ActionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

// ============================================================================
// Download Queue
// ============================================================================

/// Status of a download queue item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, QueueStatus::Pending | QueueStatus::Downloading)
    }

    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Downloading => "downloading",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
        }
    }
}

impl FromStr for QueueStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "downloading" => Ok(QueueStatus::Downloading),
            "completed" => Ok(QueueStatus::Completed),
            "failed" => Ok(QueueStatus::Failed),
            _ => Err(StoreError::InvalidData(format!("Unknown queue status: {}", s))),
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A track waiting for, or finished with, download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQueueItem {
    pub id: QueueItemId,
    pub track_id: String,
    pub title: String,
    pub artist_name: String,
    pub cover_art_url: Option<String>,
    pub status: QueueStatus,
    /// 0..=100
    pub progress: u8,
    pub error: Option<String>,
    pub added_at: i64,
    pub completed_at: Option<i64>,
}

impl DownloadQueueItem {
    /// New pending item
    pub fn new(
        track_id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
        cover_art_url: Option<String>,
        added_at: i64,
    ) -> Self {
        Self {
            id: QueueItemId::new(),
            track_id: track_id.into(),
            title: title.into(),
            artist_name: artist_name.into(),
            cover_art_url,
            status: QueueStatus::Pending,
            progress: 0,
            error: None,
            added_at,
            completed_at: None,
        }
    }
}

// ============================================================================
// Downloaded Tracks
// ============================================================================

/// Metadata row for a fully downloaded track
///
/// The payload itself lives in a separate blob table keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadedTrack {
    pub id: String,
    pub title: String,
    /// Empty when metadata was unavailable
    pub artist_id: String,
    pub artist_name: String,
    pub album_id: Option<String>,
    pub album_title: Option<String>,
    pub cover_art_url: Option<String>,
    /// 0 when unknown
    pub duration_ms: u64,
    pub genres: Vec<String>,
    pub payload_size: u64,
    pub downloaded_at: i64,
    pub last_played_at: Option<i64>,
    pub play_count: u32,
}

impl DownloadedTrack {
    /// Record with default metadata for a payload of `payload_size` bytes
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
        payload_size: u64,
        downloaded_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_id: String::new(),
            artist_name: artist_name.into(),
            album_id: None,
            album_title: None,
            cover_art_url: None,
            duration_ms: 0,
            genres: Vec::new(),
            payload_size,
            downloaded_at,
            last_played_at: None,
            play_count: 0,
        }
    }
}

/// Best-effort cover art cache entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCoverArt {
    pub url: String,
    pub data: Vec<u8>,
    pub cached_at: i64,
}

// ============================================================================
// Offline Actions
// ============================================================================

/// A play recorded while the remote may have been unreachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflinePlay {
    pub id: ActionId,
    pub track_id: String,
    pub played_at: i64,
    /// Seconds
    pub duration_played: u32,
    pub synced: bool,
}

impl OfflinePlay {
    pub fn new(track_id: impl Into<String>, played_at: i64, duration_played: u32) -> Self {
        Self {
            id: ActionId::new(),
            track_id: track_id.into(),
            played_at,
            duration_played,
            synced: false,
        }
    }
}

/// A like or unlike recorded while the remote may have been unreachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineLike {
    pub id: ActionId,
    pub track_id: String,
    pub liked_at: i64,
    pub action: LikeAction,
    pub synced: bool,
}

impl OfflineLike {
    pub fn new(track_id: impl Into<String>, liked_at: i64, action: LikeAction) -> Self {
        Self {
            id: ActionId::new(),
            track_id: track_id.into(),
            liked_at,
            action,
            synced: false,
        }
    }
}
