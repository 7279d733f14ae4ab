//! Download processor configuration

use bridge_traits::catalog::StreamQuality;

use crate::error::{DownloadError, Result};

/// Upper bound for the worker pool
pub const MAX_WORKERS: usize = 8;

/// Configuration for the download queue processor.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// Size of the transfer worker pool (default: 1)
    pub max_concurrent_downloads: usize,

    /// Quality requested when resolving stream URLs (default: high)
    pub stream_quality: StreamQuality,

    /// Fetch catalog metadata after each transfer (default: true)
    pub fetch_metadata: bool,

    /// Cache cover art after each transfer (default: true)
    pub cache_cover_art: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: 1,
            stream_quality: StreamQuality::High,
            fetch_metadata: true,
            cache_cover_art: true,
        }
    }
}

impl DownloadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_downloads(mut self, count: usize) -> Self {
        self.max_concurrent_downloads = count;
        self
    }

    pub fn with_stream_quality(mut self, quality: StreamQuality) -> Self {
        self.stream_quality = quality;
        self
    }

    pub fn with_metadata_fetch(mut self, enabled: bool) -> Self {
        self.fetch_metadata = enabled;
        self
    }

    pub fn with_cover_art_cache(mut self, enabled: bool) -> Self {
        self.cache_cover_art = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_downloads == 0 || self.max_concurrent_downloads > MAX_WORKERS {
            return Err(DownloadError::Config(format!(
                "max_concurrent_downloads must be between 1 and {}, got {}",
                MAX_WORKERS, self.max_concurrent_downloads
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DownloadConfig::default();
        assert_eq!(config.max_concurrent_downloads, 1);
        assert_eq!(config.stream_quality, StreamQuality::High);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = DownloadConfig::new()
            .with_max_concurrent_downloads(3)
            .with_stream_quality(StreamQuality::Low)
            .with_metadata_fetch(false)
            .with_cover_art_cache(false);

        assert_eq!(config.max_concurrent_downloads, 3);
        assert_eq!(config.stream_quality, StreamQuality::Low);
        assert!(!config.fetch_metadata);
        assert!(!config.cache_cover_art);
    }

    #[test]
    fn test_config_validation() {
        assert!(DownloadConfig::new()
            .with_max_concurrent_downloads(0)
            .validate()
            .is_err());
        assert!(DownloadConfig::new()
            .with_max_concurrent_downloads(MAX_WORKERS + 1)
            .validate()
            .is_err());
    }
}
