//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the offline cache:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Every other core crate depends on this one for its event types, its
//! configuration surface and its logging conventions.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, DownloadEvent, EventBus, EventChannel, Subscription, SyncEvent};
