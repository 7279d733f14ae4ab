//! Catalog API request and response types

use serde::{Deserialize, Serialize};

/// `GET /api/stream/{id}` response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamUrlResponse {
    #[serde(default)]
    pub url: Option<String>,

    /// RFC 3339 expiry of the signed URL
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// `GET /api/tracks/{id}` response
#[derive(Debug, Clone, Deserialize)]
pub struct TrackResponse {
    #[serde(default)]
    pub track: Option<TrackDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackDetails {
    #[serde(default)]
    pub artist_id: Option<String>,

    #[serde(default)]
    pub album_id: Option<String>,

    #[serde(default)]
    pub albums: Option<AlbumRef>,

    #[serde(default)]
    pub duration_ms: Option<u64>,

    #[serde(default)]
    pub genres: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub title: Option<String>,
}

/// `POST /api/play-history` body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayHistoryRequest<'a> {
    pub track_id: &'a str,
    /// RFC 3339
    pub played_at: String,
    /// Seconds listened
    pub duration: u32,
    pub source: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_response_all_fields_optional() {
        let parsed: TrackResponse = serde_json::from_str(r#"{"track": {}}"#).unwrap();
        let details = parsed.track.unwrap();
        assert!(details.artist_id.is_none());
        assert!(details.genres.is_none());

        let empty: TrackResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.track.is_none());
    }

    #[test]
    fn test_play_history_request_shape() {
        let body = PlayHistoryRequest {
            track_id: "t1",
            played_at: "2024-01-01T00:00:00+00:00".to_string(),
            duration: 42,
            source: "offline",
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["trackId"], "t1");
        assert_eq!(json["playedAt"], "2024-01-01T00:00:00+00:00");
        assert_eq!(json["duration"], 42);
        assert_eq!(json["source"], "offline");
    }
}
