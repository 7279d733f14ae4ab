//! # Host Bridge Traits
//!
//! Everything the offline cache needs from its host, expressed as `Send +
//! Sync` async traits so each platform can supply its own implementation.
//!
//! | Trait | Used by | Desktop implementation |
//! |---|---|---|
//! | [`HttpClient`](http::HttpClient) | catalog connector, download queue | `ReqwestHttpClient` |
//! | [`CatalogApi`](catalog::CatalogApi) | download queue, sync reconciler | `provider_catalog::CatalogConnector` |
//! | [`NetworkMonitor`](network::NetworkMonitor) | connectivity watcher | `DesktopNetworkMonitor` |
//! | [`StorageQuota`](storage::StorageQuota) | storage manager (display only) | `DesktopStorageQuota` |
//! | [`Clock`](time::Clock) | every component that timestamps | [`SystemClock`] |
//! | [`LoggerSink`](time::LoggerSink) | logging layer | [`ConsoleLogger`] |
//!
//! Every trait reports failures as [`BridgeError`]. Implementations map
//! their platform errors onto it and mark timeouts and unreachable hosts as
//! transient so callers know a retry may help.

pub mod catalog;
pub mod error;
pub mod http;
pub mod network;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use catalog::{CatalogApi, LikeAction, PlaySubmission, RemoteTrackMetadata, StreamQuality};
pub use http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use storage::{StorageEstimate, StorageQuota};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
