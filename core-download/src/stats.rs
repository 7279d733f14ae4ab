//! Storage figures and formatting helpers

use bridge_traits::storage::StorageEstimate;
use serde::{Deserialize, Serialize};

const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with base 1024, one decimal, and a trailing `.0` trimmed.
///
/// `0` → `"0 B"`, `1536` → `"1.5 KB"`, `1048576` → `"1 MB"`. GB is the largest unit.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let formatted = format!("{:.1}", value);
    let trimmed = formatted.strip_suffix(".0").unwrap_or(&formatted);
    format!("{} {}", trimmed, UNITS[unit])
}

/// Whole-percent progress, clamped to 100. `total` must be non-zero.
pub fn progress_percent(received: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }

    ((received as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Display-ready view of the host storage estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub used: u64,
    pub quota: u64,
    pub used_formatted: String,
    pub quota_formatted: String,
    pub percent_used: u8,
}

impl From<StorageEstimate> for StorageInfo {
    fn from(estimate: StorageEstimate) -> Self {
        Self {
            used: estimate.usage,
            quota: estimate.quota,
            used_formatted: format_bytes(estimate.usage),
            quota_formatted: format_bytes(estimate.quota),
            percent_used: estimate.percent_used(),
        }
    }
}

/// Downloaded payload totals measured from the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub track_count: u64,
    pub used_bytes: u64,
    pub budget_bytes: Option<u64>,
}

impl StorageStats {
    /// Bytes above the budget, 0 when under or without a budget
    pub fn space_needed(&self) -> u64 {
        self.budget_bytes
            .map(|budget| self.used_bytes.saturating_sub(budget))
            .unwrap_or(0)
    }

    pub fn is_over_budget(&self) -> bool {
        self.space_needed() > 0
    }

    pub fn average_track_size(&self) -> u64 {
        if self.track_count == 0 {
            0
        } else {
            self.used_bytes / self.track_count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1048576), "1 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 + 300 * 1024), "5.3 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3 GB");
        assert_eq!(format_bytes(2048 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, 100), 0);
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(100, 100), 100);
        assert_eq!(progress_percent(150, 100), 100);
        assert_eq!(progress_percent(5, 0), 0);
    }

    #[test]
    fn test_storage_info_from_estimate() {
        let info = StorageInfo::from(StorageEstimate::new(1536, 1024 * 1024));
        assert_eq!(info.used_formatted, "1.5 KB");
        assert_eq!(info.quota_formatted, "1 MB");
        assert_eq!(info.percent_used, 0);

        let empty = StorageInfo::from(StorageEstimate::new(0, 0));
        assert_eq!(empty.percent_used, 0);
        assert_eq!(empty.quota_formatted, "0 B");
    }

    #[test]
    fn test_storage_stats() {
        let stats = StorageStats {
            track_count: 3,
            used_bytes: 12,
            budget_bytes: Some(10),
        };
        assert_eq!(stats.space_needed(), 2);
        assert!(stats.is_over_budget());
        assert_eq!(stats.average_track_size(), 4);

        let unbounded = StorageStats {
            budget_bytes: None,
            ..stats
        };
        assert_eq!(unbounded.space_needed(), 0);
    }
}
