//! # Core Configuration Module
//!
//! Provides configuration management for the offline cache core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all bridges and settings required by the core. It
//! enforces fail-fast validation so missing capabilities are reported before
//! any background work starts.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - Catalog API calls and media downloads (desktop default: reqwest)
//!
//! ## Optional Dependencies
//!
//! - `NetworkMonitor` - Drives sync on the offline→online transition
//!   (desktop default: TCP probe of the catalog host)
//! - `StorageQuota` - Advisory usage/quota figures for display
//! - `Clock` - Defaults to `SystemClock`
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/offline.db")
//!     .api_base_url("https://music.example.com")
//!     .storage_budget_bytes(2 * 1024 * 1024 * 1024)
//!     .auto_evict(true)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing the catalog base URL
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/offline.db")
//!     .build()
//!     .expect("Should fail - missing api_base_url");
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{Clock, HttpClient, NetworkMonitor, StorageQuota, StreamQuality, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Path that selects an in-memory SQLite database.
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Default number of concurrent transfers.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 1;

/// Upper bound for concurrent transfers.
pub const MAX_CONCURRENT_DOWNLOADS_LIMIT: usize = 8;

/// Default retention window for synced offline actions.
pub const DEFAULT_SYNC_RETENTION_DAYS: u32 = 7;

/// Core configuration for the offline cache.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file, or [`IN_MEMORY_DATABASE`]
    pub database_path: PathBuf,

    /// Base URL of the catalog API, without trailing slash
    pub api_base_url: String,

    /// Quality requested when resolving stream URLs
    pub stream_quality: StreamQuality,

    /// Size of the download worker pool
    pub max_concurrent_downloads: usize,

    /// Byte budget for downloaded payloads
    pub storage_budget_bytes: Option<u64>,

    /// Run budget enforcement after every completed download
    pub auto_evict: bool,

    /// Synced plays/likes older than this are purged by cleanup
    pub sync_retention_days: u32,

    /// Broadcast buffer of the event bus
    pub event_buffer_size: usize,

    /// HTTP client for catalog calls and downloads
    pub http_client: Arc<dyn HttpClient>,

    /// Network connectivity monitor (optional)
    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    /// Host storage estimate (optional)
    pub storage_quota: Option<Arc<dyn StorageQuota>>,

    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("api_base_url", &self.api_base_url)
            .field("stream_quality", &self.stream_quality)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("storage_budget_bytes", &self.storage_budget_bytes)
            .field("auto_evict", &self.auto_evict)
            .field("sync_retention_days", &self.sync_retention_days)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "storage_quota",
                &self.storage_quota.as_ref().map(|_| "StorageQuota { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_DATABASE
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if self.api_base_url.trim().is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }

        if self.max_concurrent_downloads == 0
            || self.max_concurrent_downloads > MAX_CONCURRENT_DOWNLOADS_LIMIT
        {
            return Err(Error::Config(format!(
                "max_concurrent_downloads must be between 1 and {}",
                MAX_CONCURRENT_DOWNLOADS_LIMIT
            )));
        }

        if self.storage_budget_bytes == Some(0) {
            return Err(Error::Config(
                "Storage budget must be greater than 0 bytes".to_string(),
            ));
        }

        if self.auto_evict && self.storage_budget_bytes.is_none() {
            return Err(Error::Config(
                "auto_evict requires a storage budget. \
                 Set .storage_budget_bytes() or disable auto_evict."
                    .to_string(),
            ));
        }

        if self.sync_retention_days == 0 || self.sync_retention_days > 365 {
            return Err(Error::Config(
                "sync_retention_days must be between 1 and 365".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client: Arc<dyn HttpClient> = Arc::new(bridge_desktop::ReqwestHttpClient::new());
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for catalog calls and downloads. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Other hosts: inject a platform-native adapter."
            .to_string(),
    })
}

/// Desktop hosts probe the catalog host itself for reachability.
#[cfg(feature = "desktop-shims")]
fn provide_default_network_monitor(api_base_url: &str) -> Option<Arc<dyn NetworkMonitor>> {
    let monitor: Arc<dyn NetworkMonitor> =
        Arc::new(bridge_desktop::DesktopNetworkMonitor::for_api(api_base_url));
    Some(monitor)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_network_monitor(_api_base_url: &str) -> Option<Arc<dyn NetworkMonitor>> {
    None
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    api_base_url: Option<String>,
    stream_quality: Option<StreamQuality>,
    max_concurrent_downloads: Option<usize>,
    storage_budget_bytes: Option<u64>,
    auto_evict: bool,
    sync_retention_days: Option<u32>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    storage_quota: Option<Arc<dyn StorageQuota>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Uses an in-memory database. Data is lost on shutdown.
    pub fn in_memory(mut self) -> Self {
        self.database_path = Some(PathBuf::from(IN_MEMORY_DATABASE));
        self
    }

    /// Sets the catalog API base URL. A trailing slash is stripped.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.api_base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Default: high
    pub fn stream_quality(mut self, quality: StreamQuality) -> Self {
        self.stream_quality = Some(quality);
        self
    }

    /// Default: 1 (transfers are serialized)
    pub fn max_concurrent_downloads(mut self, workers: usize) -> Self {
        self.max_concurrent_downloads = Some(workers);
        self
    }

    pub fn storage_budget_bytes(mut self, bytes: u64) -> Self {
        self.storage_budget_bytes = Some(bytes);
        self
    }

    /// Requires a storage budget. Default: false
    pub fn auto_evict(mut self, enabled: bool) -> Self {
        self.auto_evict = enabled;
        self
    }

    /// Default: 7
    pub fn sync_retention_days(mut self, days: u32) -> Self {
        self.sync_retention_days = Some(days);
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn storage_quota(mut self, quota: Arc<dyn StorageQuota>) -> Self {
        self.storage_quota = Some(quota);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if:
    /// - The database path or API base URL is missing
    /// - No HTTP client is available
    /// - Any value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config(
                "Database path is required. Use .database_path() or .in_memory() to set it."
                    .to_string(),
            )
        })?;

        let api_base_url = self.api_base_url.ok_or_else(|| {
            Error::Config("API base URL is required. Use .api_base_url() to set it.".to_string())
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let network_monitor = self
            .network_monitor
            .or_else(|| provide_default_network_monitor(&api_base_url));

        let config = CoreConfig {
            database_path,
            api_base_url,
            stream_quality: self.stream_quality.unwrap_or_default(),
            max_concurrent_downloads: self
                .max_concurrent_downloads
                .unwrap_or(DEFAULT_MAX_CONCURRENT_DOWNLOADS),
            storage_budget_bytes: self.storage_budget_bytes,
            auto_evict: self.auto_evict,
            sync_retention_days: self
                .sync_retention_days
                .unwrap_or(DEFAULT_SYNC_RETENTION_DAYS),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            network_monitor,
            storage_quota: self.storage_quota,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };

        config.validate()?;

        Ok(config)
    }
}
