use bridge_traits::BridgeError;
use core_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// A single entry could not be delivered; it stays queued
    #[error("Failed to deliver {kind}: {message}")]
    Delivery { kind: String, message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid sync configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
