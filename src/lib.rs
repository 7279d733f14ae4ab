//! Workspace facade crate.
//!
//! Re-exports the offline cache core so host applications can depend on
//! `offline-cache-workspace` and pick the platform shims through features
//! instead of wiring `core-service` and its bridges individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
