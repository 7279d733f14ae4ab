//! # Desktop Bridges
//!
//! Bridge implementations for macOS, Windows and Linux hosts, enabled in the
//! core through the `desktop-shims` feature.
//!
//! - [`ReqwestHttpClient`]: catalog calls with retry, and streaming media downloads
//! - [`DesktopNetworkMonitor`]: TCP reachability probe, polled for changes
//! - [`DesktopStorageQuota`]: size of the data directory against a fixed quota
//!
//! ```ignore
//! use bridge_desktop::{DesktopNetworkMonitor, ReqwestHttpClient};
//!
//! let config = CoreConfig::builder()
//!     .database_path("offline.db")
//!     .api_base_url("https://music.example.com")
//!     .http_client(Arc::new(ReqwestHttpClient::new()))
//!     .network_monitor(Arc::new(DesktopNetworkMonitor::new()))
//!     .build()?;
//! ```

mod http;
mod network;
mod quota;

pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
pub use quota::DesktopStorageQuota;
