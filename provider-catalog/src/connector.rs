//! Catalog API connector
//!
//! Implements `CatalogApi` over the host's `HttpClient`.

use async_trait::async_trait;
use bridge_traits::catalog::{
    CatalogApi, LikeAction, PlaySubmission, RemoteTrackMetadata, StreamQuality,
};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use chrono::SecondsFormat;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::CatalogError;
use crate::types::{PlayHistoryRequest, StreamUrlResponse, TrackResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source tag attached to plays delivered from the offline buffer
const OFFLINE_SOURCE: &str = "offline";

/// Catalog API connector
///
/// Stateless apart from its HTTP client, so one instance can be shared by the
/// download processor and the sync reconciler.
///
/// ```ignore
/// use provider_catalog::CatalogConnector;
/// use bridge_traits::catalog::{CatalogApi, StreamQuality};
///
/// let catalog = CatalogConnector::new(http_client, "https://music.example.com");
/// let url = catalog.resolve_stream_url("track-1", StreamQuality::High).await?;
/// ```
pub struct CatalogConnector {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    retry_policy: RetryPolicy,
}

impl CatalogConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            http_client,
            base_url,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Retry policy for 429 and 5xx responses and transient transport errors
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, retrying rate limits, server errors and transient
    /// transport failures with backoff. Client errors are returned immediately.
    #[instrument(skip(self, request), fields(method = ?request.method, url = %request.url))]
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.http_client.execute(request.clone()).await {
                Ok(response) if response.is_success() => {
                    debug!(status = response.status, "Catalog request succeeded");
                    return Ok(response);
                }
                Ok(response) if response.is_retryable() => {
                    if attempt >= max_attempts {
                        warn!(
                            status = response.status,
                            attempts = attempt,
                            "Catalog request failed after retries"
                        );
                        return Err(CatalogError::ApiError {
                            status_code: response.status,
                            message: format!("Request failed after {} attempts", attempt),
                        }
                        .into());
                    }

                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    warn!(
                        status = response.status,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Catalog request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Ok(response) => {
                    warn!(status = response.status, "Catalog request rejected");
                    return Err(CatalogError::ApiError {
                        status_code: response.status,
                        message: String::from_utf8_lossy(&response.body).to_string(),
                    }
                    .into());
                }
                Err(e) if !e.is_transient() => {
                    warn!(error = %e, "Catalog request failed");
                    return Err(e);
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        warn!(error = %e, attempts = attempt, "Catalog request failed after retries");
                        return Err(e);
                    }

                    let delay = self.retry_policy.delay_for_attempt(attempt);
                    warn!(error = %e, attempt, max_attempts, "Catalog request failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl CatalogApi for CatalogConnector {
    #[instrument(skip(self))]
    async fn resolve_stream_url(&self, track_id: &str, quality: StreamQuality) -> Result<String> {
        let url = self.url(&format!(
            "/api/stream/{}?quality={}",
            urlencoding::encode(track_id),
            quality.as_str()
        ));

        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);
        let response = self.send(request).await?;

        let parsed: StreamUrlResponse = serde_json::from_slice(&response.body).map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse stream response: {}", e))
        })?;

        match parsed.url {
            Some(url) if !url.trim().is_empty() => {
                debug!(expires_at = ?parsed.expires_at, "Resolved stream URL");
                Ok(url)
            }
            _ => Err(CatalogError::MissingStreamUrl {
                track_id: track_id.to_string(),
            }
            .into()),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_track_metadata(&self, track_id: &str) -> Result<RemoteTrackMetadata> {
        let url = self.url(&format!("/api/tracks/{}", urlencoding::encode(track_id)));

        let request = HttpRequest::get(url)
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);
        let response = self.send(request).await?;

        let parsed: TrackResponse = serde_json::from_slice(&response.body).map_err(|e| {
            CatalogError::ParseError(format!("Failed to parse track response: {}", e))
        })?;

        let details = parsed.track.unwrap_or_default();

        Ok(RemoteTrackMetadata {
            artist_id: details.artist_id,
            album_id: details.album_id,
            album_title: details.albums.and_then(|album| album.title),
            duration_ms: details.duration_ms,
            genres: details.genres.unwrap_or_default(),
        })
    }

    #[instrument(skip(self, play), fields(track_id = %play.track_id, key = %play.idempotency_key))]
    async fn submit_play(&self, play: &PlaySubmission) -> Result<()> {
        let body = PlayHistoryRequest {
            track_id: &play.track_id,
            played_at: play.played_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration: play.duration_secs,
            source: OFFLINE_SOURCE,
        };

        let request = HttpRequest::post(self.url("/api/play-history"))
            .json(&body)?
            .idempotency_key(play.idempotency_key.clone())
            .timeout(REQUEST_TIMEOUT);

        self.send(request).await?;
        info!("Delivered offline play");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn submit_like(
        &self,
        track_id: &str,
        action: LikeAction,
        idempotency_key: &str,
    ) -> Result<()> {
        let url = self.url(&format!(
            "/api/tracks/{}/{}",
            urlencoding::encode(track_id),
            action.as_str()
        ));

        let request = HttpRequest::post(url)
            .idempotency_key(idempotency_key)
            .timeout(REQUEST_TIMEOUT);

        self.send(request).await?;
        info!("Delivered offline {}", action);
        Ok(())
    }
}
