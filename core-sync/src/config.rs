//! Reconciler configuration

use crate::error::{Result, SyncError};

/// Default retention window for delivered actions
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Offline action reconciler configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Days a delivered action is kept before `cleanup_expired` removes it
    pub retention_days: u32,

    /// Sync once when the watcher starts on a connected network
    pub sync_on_start: bool,

    /// Skip automatic syncs on metered networks
    pub wifi_only: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            sync_on_start: true,
            wifi_only: false,
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_sync_on_start(mut self, enabled: bool) -> Self {
        self.sync_on_start = enabled;
        self
    }

    pub fn with_wifi_only(mut self, enabled: bool) -> Self {
        self.wifi_only = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.retention_days == 0 || self.retention_days > 365 {
            return Err(SyncError::Config(format!(
                "retention_days must be between 1 and 365, got {}",
                self.retention_days
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_builder() {
        let config = SyncConfig::default();
        assert_eq!(config.retention_days, 7);
        assert!(config.sync_on_start);
        assert!(!config.wifi_only);
        assert!(config.validate().is_ok());

        let config = SyncConfig::new()
            .with_retention_days(30)
            .with_sync_on_start(false)
            .with_wifi_only(true);
        assert_eq!(config.retention_days, 30);
        assert!(!config.sync_on_start);
        assert!(config.wifi_only);
    }

    #[test]
    fn test_validation() {
        assert!(SyncConfig::new().with_retention_days(0).validate().is_err());
        assert!(SyncConfig::new().with_retention_days(366).validate().is_err());
    }
}
