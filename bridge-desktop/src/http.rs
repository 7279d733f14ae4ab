//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Reqwest-based HTTP client
///
/// API calls use the client-wide timeout. Media downloads get a separate,
/// much longer whole-transfer timeout.
pub struct ReqwestHttpClient {
    client: Client,
    download_timeout: Duration,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Falls back to reqwest's defaults if the builder rejects the settings.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("offline-cache-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });

        Self::with_client(client)
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
        }
    }

    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }

    fn build_request(&self, request: HttpRequest) -> reqwest::RequestBuilder {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in request.headers {
            builder = builder.header(key, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        builder
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a reqwest failure onto the bridge error classes
fn classify(error: reqwest::Error, url: &str) -> BridgeError {
    if error.is_timeout() {
        BridgeError::Timeout(url.to_string())
    } else if error.is_connect() {
        BridgeError::Connection(format!("{}: {}", url, error))
    } else {
        BridgeError::OperationFailed(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        debug!(method = ?request.method, url = %url, "Sending HTTP request");

        let response = self
            .build_request(request)
            .send()
            .await
            .map_err(|e| classify(e, &url))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response.bytes().await.map_err(|e| classify(e, &url))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self.execute(request.clone()).await;

            let retry = match &outcome {
                Ok(response) => response.is_retryable(),
                Err(e) => e.is_transient(),
            };
            if !retry || attempt >= max_attempts {
                return outcome;
            }

            let delay = policy.delay_for_attempt(attempt);
            warn!(
                url = %request.url,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "HTTP request failed, retrying"
            );
            sleep(delay).await;
        }
    }

    async fn download_stream(&self, url: String) -> Result<ByteStream> {
        let response = self
            .client
            .get(&url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| classify(e, &url))?;

        if !response.status().is_success() {
            return Err(BridgeError::OperationFailed(format!(
                "GET {} returned {}",
                url,
                response.status()
            )));
        }

        let content_length = response.content_length();
        debug!(url = %url, content_length = ?content_length, "Opened download stream");

        let chunks = response
            .bytes_stream()
            .map_err(move |e| {
                if e.is_timeout() {
                    BridgeError::Timeout(url.clone())
                } else {
                    BridgeError::OperationFailed(format!("Stream read failed: {}", e))
                }
            })
            .boxed();

        Ok(ByteStream::new(content_length, chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response per accepted connection
    async fn serve(responses: Vec<&'static str>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for raw in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                socket.write_all(raw.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        format!("http://{}", addr)
    }

    const OK_BODY: &str =
        "HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello";
    const UNAVAILABLE: &str =
        "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

    #[tokio::test]
    async fn test_connection_refused_is_transient() {
        let client = ReqwestHttpClient::with_timeout(Duration::from_millis(500));
        // Nothing listens on the discard port locally
        let result = client
            .download_stream("http://127.0.0.1:9/track.mp3".to_string())
            .await;

        match result {
            Err(e) => assert!(e.is_transient(), "unexpected error: {e}"),
            Ok(_) => panic!("expected connection failure"),
        }
    }

    #[tokio::test]
    async fn test_download_stream_reports_length() {
        let base = serve(vec![OK_BODY]).await;
        let client = ReqwestHttpClient::new();

        let stream = client.download_stream(format!("{}/t1", base)).await.unwrap();
        assert_eq!(stream.content_length, Some(5));

        let body: Vec<u8> = stream
            .chunks
            .map(|chunk| chunk.unwrap().to_vec())
            .concat()
            .await;
        assert_eq!(body, b"hello");
    }

    #[tokio::test]
    async fn test_download_stream_rejects_error_status() {
        let base = serve(vec![UNAVAILABLE]).await;
        let client = ReqwestHttpClient::new();

        let result = client.download_stream(format!("{}/t1", base)).await;
        assert!(matches!(result, Err(BridgeError::OperationFailed(msg)) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_retry_on_unavailable() {
        let base = serve(vec![UNAVAILABLE, OK_BODY]).await;
        let client = ReqwestHttpClient::new();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            use_exponential_backoff: true,
        };

        let response = client
            .execute_with_retry(HttpRequest::get(format!("{}/api/tracks/t1", base)), policy)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(&response.body[..], b"hello");
    }
}
