use core_store::StoreError;
use thiserror::Error;

/// Errors produced by the download processor, library and eviction manager.
///
/// Per-item failures (`SourceResolution`, `Transfer`, `Cancelled`,
/// `StorageWrite`) are recorded on the queue item and published as events;
/// they never escape the drain loop.
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Failed to resolve stream source: {0}")]
    SourceResolution(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Failed to store download: {0}")]
    StorageWrite(String),

    /// Never fatal; defaults are used instead
    #[error("Failed to fetch track metadata: {0}")]
    MetadataFetch(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid download configuration: {0}")]
    Config(String),
}

impl DownloadError {
    /// Failures of the byte transfer itself, including cancellation
    pub fn is_transfer(&self) -> bool {
        matches!(self, DownloadError::Transfer(_) | DownloadError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_message() {
        assert_eq!(DownloadError::Cancelled.to_string(), "Transfer cancelled");
    }

    #[test]
    fn test_transfer_class() {
        assert!(DownloadError::Cancelled.is_transfer());
        assert!(DownloadError::Transfer("reset".to_string()).is_transfer());
        assert!(!DownloadError::SourceResolution("404".to_string()).is_transfer());
        assert!(!DownloadError::StorageWrite("disk".to_string()).is_transfer());
    }
}
