//! Remote Catalog Abstraction
//!
//! The remote system of record: resolves playable stream URLs, serves track
//! metadata and accepts offline plays and likes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Requested stream quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl StreamQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamQuality::Low => "low",
            StreamQuality::Medium => "medium",
            StreamQuality::High => "high",
        }
    }
}

impl fmt::Display for StreamQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamQuality {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(StreamQuality::Low),
            "medium" => Ok(StreamQuality::Medium),
            "high" => Ok(StreamQuality::High),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown stream quality: {}",
                other
            ))),
        }
    }
}

/// Like/unlike action delivered to the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeAction {
    Like,
    Unlike,
}

impl LikeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LikeAction::Like => "like",
            LikeAction::Unlike => "unlike",
        }
    }
}

impl fmt::Display for LikeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LikeAction {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "like" => Ok(LikeAction::Like),
            "unlike" => Ok(LikeAction::Unlike),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown like action: {}",
                other
            ))),
        }
    }
}

/// Track metadata as served by the catalog. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTrackMetadata {
    pub artist_id: Option<String>,
    pub album_id: Option<String>,
    pub album_title: Option<String>,
    pub duration_ms: Option<u64>,
    pub genres: Vec<String>,
}

/// A single offline play to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaySubmission {
    /// Stable key of the local record; resent on redelivery
    pub idempotency_key: String,
    pub track_id: String,
    pub played_at: DateTime<Utc>,
    /// Seconds listened
    pub duration_secs: u32,
}

/// Remote catalog trait
///
/// Implementations should be stateless over an [`HttpClient`](crate::HttpClient)
/// so they can be shared by the download processor and the sync reconciler.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Resolve a time-limited stream URL for the track
    async fn resolve_stream_url(&self, track_id: &str, quality: StreamQuality) -> Result<String>;

    /// Fetch descriptive metadata for the track
    async fn fetch_track_metadata(&self, track_id: &str) -> Result<RemoteTrackMetadata>;

    /// Deliver a recorded play
    async fn submit_play(&self, play: &PlaySubmission) -> Result<()>;

    /// Deliver a like or unlike
    async fn submit_like(
        &self,
        track_id: &str,
        action: LikeAction,
        idempotency_key: &str,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_quality_parsing() {
        assert_eq!("high".parse::<StreamQuality>().unwrap(), StreamQuality::High);
        assert_eq!(StreamQuality::default(), StreamQuality::High);
        assert_eq!(StreamQuality::Low.to_string(), "low");
        assert!("lossless".parse::<StreamQuality>().is_err());
    }

    #[test]
    fn test_like_action_round_trip() {
        for action in [LikeAction::Like, LikeAction::Unlike] {
            assert_eq!(action.as_str().parse::<LikeAction>().unwrap(), action);
        }
        assert_eq!(
            serde_json::to_string(&LikeAction::Unlike).unwrap(),
            "\"unlike\""
        );
    }
}
