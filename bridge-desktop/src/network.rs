//! Connectivity probe for desktop hosts

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    network::{NetworkChangeStream, NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::debug;

const DEFAULT_PROBE_ADDR: &str = "1.1.1.1:443";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Desktop network monitor
///
/// A host counts as online when a TCP connection to the probe address opens
/// within the timeout. Changes are found by re-probing on an interval.
/// Desktop links are reported as unmetered.
#[derive(Debug, Clone)]
pub struct DesktopNetworkMonitor {
    probe_addr: String,
    probe_timeout: Duration,
    poll_interval: Duration,
}

impl DesktopNetworkMonitor {
    pub fn new() -> Self {
        Self {
            probe_addr: DEFAULT_PROBE_ADDR.to_string(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Probe the catalog API host itself.
    ///
    /// Falls back to the default probe when `base_url` has no host.
    pub fn for_api(base_url: &str) -> Self {
        match probe_addr_for(base_url) {
            Some(addr) => Self::new().with_probe_addr(addr),
            None => Self::new(),
        }
    }

    /// `host:port` to connect to
    pub fn with_probe_addr(mut self, addr: impl Into<String>) -> Self {
        self.probe_addr = addr.into();
        self
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn probe(&self) -> NetworkStatus {
        match timeout(self.probe_timeout, TcpStream::connect(self.probe_addr.as_str())).await {
            Ok(Ok(_)) => NetworkStatus::Connected,
            _ => NetworkStatus::Disconnected,
        }
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// `host:port` of an http(s) URL, with the scheme's default port
fn probe_addr_for(base_url: &str) -> Option<String> {
    let (rest, default_port) = if let Some(rest) = base_url.strip_prefix("https://") {
        (rest, 443)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        (rest, 80)
    } else {
        return None;
    };

    let authority = rest.split(['/', '?']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    if authority.is_empty() {
        return None;
    }

    let has_port = authority
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()));
    if has_port {
        Some(authority.to_string())
    } else {
        Some(format!("{}:{}", authority, default_port))
    }
}

#[async_trait]
impl NetworkMonitor for DesktopNetworkMonitor {
    async fn get_network_info(&self) -> Result<NetworkInfo> {
        let status = self.probe().await;
        debug!(probe = %self.probe_addr, status = ?status, "Probed connectivity");

        Ok(match status {
            // The link type is not visible from a socket probe
            NetworkStatus::Connected => NetworkInfo::connected(Some(NetworkType::Other)),
            NetworkStatus::Disconnected => NetworkInfo::disconnected(),
        })
    }

    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>> {
        Ok(Box::new(PollingChanges {
            monitor: self.clone(),
            last: None,
        }))
    }
}

/// Re-probes every `poll_interval` and yields only when the status flips
struct PollingChanges {
    monitor: DesktopNetworkMonitor,
    last: Option<NetworkStatus>,
}

#[async_trait]
impl NetworkChangeStream for PollingChanges {
    async fn next(&mut self) -> Option<NetworkInfo> {
        loop {
            sleep(self.monitor.poll_interval).await;

            let Ok(info) = self.monitor.get_network_info().await else {
                continue;
            };
            if self.last != Some(info.status) {
                self.last = Some(info.status);
                return Some(info);
            }
        }
    }
}
