//! # Offline Action Sync
//!
//! Buffers plays, likes and unlikes recorded while offline and delivers them
//! to the catalog when connectivity returns.
//!
//! ## Components
//!
//! - **Reconciler** (`reconciler`): local-first recording, at-least-once
//!   delivery with idempotency keys, retention cleanup
//! - **Connectivity Watcher** (`watcher`): triggers a sync at start and on
//!   every offline→online transition

pub mod config;
pub mod error;
pub mod reconciler;
pub mod watcher;

pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use reconciler::{SyncReconciler, SyncSummary, UnsyncedCounts};
pub use watcher::ConnectivityWatcher;
