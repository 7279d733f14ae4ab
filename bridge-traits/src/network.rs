//! Connectivity Abstraction
//!
//! The sync reconciler only delivers offline actions while the host is
//! online, and reacts to the moment it comes back online.

use async_trait::async_trait;

use crate::error::Result;

/// Kind of link the host is on, when it can tell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    Cellular,
    WiFi,
    Ethernet,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Connected,
    Disconnected,
}

/// Snapshot of the host's connectivity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Data on this link is capped or billed
    pub is_metered: bool,
}

impl NetworkInfo {
    pub fn connected(network_type: Option<NetworkType>) -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type,
            is_metered: false,
        }
    }

    pub fn metered(network_type: Option<NetworkType>) -> Self {
        Self {
            is_metered: true,
            ..Self::connected(network_type)
        }
    }

    pub fn disconnected() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == NetworkStatus::Connected
    }

    /// Whether remote delivery may run on this link.
    ///
    /// With `unmetered_only`, a metered connection counts as offline.
    pub fn allows_sync(&self, unmetered_only: bool) -> bool {
        self.is_connected() && !(unmetered_only && self.is_metered)
    }
}

/// Network monitor trait
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn deliver_if_online(monitor: &dyn NetworkMonitor) {
///     if monitor.is_connected().await {
///         // flush offline plays
///     }
/// }
/// ```
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity
    async fn get_network_info(&self) -> Result<NetworkInfo>;

    /// `false` when the status cannot be determined
    async fn is_connected(&self) -> bool {
        self.get_network_info()
            .await
            .map(|info| info.is_connected())
            .unwrap_or(false)
    }

    /// Stream of connectivity changes.
    ///
    /// Implementations emit whenever the status changes; consumers compare
    /// against the previous value to find transitions.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

#[async_trait]
pub trait NetworkChangeStream: Send {
    /// Next observed state, or `None` once the stream is closed
    async fn next(&mut self) -> Option<NetworkInfo>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;

    struct Unknown;

    #[async_trait]
    impl NetworkMonitor for Unknown {
        async fn get_network_info(&self) -> Result<NetworkInfo> {
            Err(BridgeError::NotAvailable("network".to_string()))
        }

        async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
            Err(BridgeError::NotAvailable("network".to_string()))
        }
    }

    #[test]
    fn test_allows_sync() {
        let wifi = NetworkInfo::connected(Some(NetworkType::WiFi));
        let cellular = NetworkInfo::metered(Some(NetworkType::Cellular));

        assert!(wifi.allows_sync(true));
        assert!(cellular.allows_sync(false));
        assert!(!cellular.allows_sync(true));
        assert!(!NetworkInfo::disconnected().allows_sync(false));
    }

    #[tokio::test]
    async fn test_unknown_status_counts_as_offline() {
        assert!(!Unknown.is_connected().await);
    }
}
