//! # Offline Downloads
//!
//! Download queue processing, access to downloaded tracks, and storage
//! eviction for the offline cache.
//!
//! ## Components
//!
//! - [`DownloadQueue`]: persistent FIFO drained by a bounded worker pool
//! - [`OfflineLibrary`]: downloaded tracks, payloads and cover art
//! - [`StorageManager`]: usage accounting and least-recently-played eviction
//!
//! ```rust,ignore
//! use core_download::{DownloadConfig, DownloadQueue, QueueTrack};
//!
//! let queue = DownloadQueue::new(DownloadConfig::default(), store, catalog, http, events, clock)?;
//! queue.start().await?;
//! queue.enqueue(QueueTrack::new("track-1", "Song", "Artist")).await?;
//! ```

pub mod config;
pub mod error;
pub mod eviction;
pub mod library;
pub mod queue;
pub mod stats;

pub use config::DownloadConfig;
pub use error::{DownloadError, Result};
pub use eviction::StorageManager;
pub use library::OfflineLibrary;
pub use queue::{DownloadQueue, QueuePause, QueueTrack};
pub use stats::{format_bytes, progress_percent, StorageInfo, StorageStats};
