//! Event bus for queue and sync notifications
//!
//! Events travel over `tokio::sync::broadcast` rings, one per
//! [`EventChannel`] plus one carrying everything. Each ring keeps emission
//! order. Hosts usually attach to a single channel through
//! [`EventBus::subscribe_channel`]:
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, DownloadEvent, EventBus, EventChannel};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut progress = event_bus.subscribe_channel(EventChannel::Progress);
//!
//! event_bus
//!     .emit(CoreEvent::Download(DownloadEvent::Progress {
//!         track_id: "track-1".to_string(),
//!         progress: 40,
//!         received: 400,
//!         total: 1000,
//!     }))
//!     .ok();
//!
//! let event = progress.recv().await.unwrap();
//! assert_eq!(event.channel(), EventChannel::Progress);
//!
//! progress.unsubscribe();
//! progress.unsubscribe(); // no-op
//! # }
//! ```
//!
//! Late subscribers get no replay. A subscriber that falls more than the
//! buffer size behind sees `RecvError::Lagged(n)` once and then carries on.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Broadcast capacity used when none is configured
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Anything published on the bus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Download queue events
    Download(DownloadEvent),
    /// Offline action reconciliation events
    Sync(SyncEvent),
}

impl CoreEvent {
    /// Short fixed label, used as the log message
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Download(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Download(DownloadEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::DeliveryFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Download(DownloadEvent::Complete { .. }) => EventSeverity::Info,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// The subscription channel this event is delivered on.
    pub fn channel(&self) -> EventChannel {
        match self {
            CoreEvent::Download(DownloadEvent::Progress { .. }) => EventChannel::Progress,
            CoreEvent::Download(DownloadEvent::Complete { .. }) => EventChannel::Complete,
            CoreEvent::Download(DownloadEvent::Error { .. }) => EventChannel::Error,
            CoreEvent::Download(DownloadEvent::QueueUpdate { .. }) => EventChannel::QueueUpdate,
            CoreEvent::Sync(_) => EventChannel::Sync,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Named subscription channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventChannel {
    Progress,
    Complete,
    Error,
    QueueUpdate,
    Sync,
}

impl EventChannel {
    pub const COUNT: usize = 5;

    fn index(self) -> usize {
        match self {
            EventChannel::Progress => 0,
            EventChannel::Complete => 1,
            EventChannel::Error => 2,
            EventChannel::QueueUpdate => 3,
            EventChannel::Sync => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventChannel::Progress => "progress",
            EventChannel::Complete => "complete",
            EventChannel::Error => "error",
            EventChannel::QueueUpdate => "queue-update",
            EventChannel::Sync => "sync",
        }
    }
}

impl fmt::Display for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Download Events
// ============================================================================

/// One row of a queue snapshot carried by [`DownloadEvent::QueueUpdate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueEntrySnapshot {
    pub id: String,
    pub track_id: String,
    pub title: String,
    pub artist_name: String,
    /// `pending`, `downloading`, `completed` or `failed`
    pub status: String,
    pub progress: u8,
    pub error: Option<String>,
}

/// Events published by the download queue processor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum DownloadEvent {
    /// A chunk was received for an active transfer.
    Progress {
        track_id: String,
        /// Percentage 0-100, non-decreasing per transfer.
        progress: u8,
        /// Bytes received so far.
        received: u64,
        /// Total bytes advertised by the source.
        total: u64,
    },
    /// Track payload persisted and queue item completed.
    Complete { track_id: String, title: String },
    /// Queue item failed.
    Error {
        track_id: String,
        title: String,
        error: String,
    },
    /// The queue changed; carries the full ordered snapshot.
    QueueUpdate { snapshot: Vec<QueueEntrySnapshot> },
}

impl DownloadEvent {
    fn description(&self) -> &str {
        match self {
            DownloadEvent::Progress { .. } => "Download in progress",
            DownloadEvent::Complete { .. } => "Download completed",
            DownloadEvent::Error { .. } => "Download failed",
            DownloadEvent::QueueUpdate { .. } => "Download queue updated",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events published by the offline action reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A full reconciliation pass started.
    Started,
    /// A full reconciliation pass finished.
    Completed {
        /// Play history entries delivered.
        play_history: u64,
        /// Like/unlike entries delivered.
        liked_tracks: u64,
    },
    /// A single entry could not be delivered and stays queued.
    DeliveryFailed {
        /// `play` or `like`
        kind: String,
        track_id: String,
        message: String,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started => "Offline sync started",
            SyncEvent::Completed { .. } => "Offline sync completed",
            SyncEvent::DeliveryFailed { .. } => "Offline action delivery failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Shared publisher handle. Clones publish into the same rings.
///
/// Each [`EventChannel`] has its own ring of `capacity` slots, so a burst of
/// progress events cannot push a completion out of a completion subscriber's
/// buffer. A separate ring carries every event for [`EventBus::subscribe`].
#[derive(Clone)]
pub struct EventBus {
    all: broadcast::Sender<CoreEvent>,
    channels: [broadcast::Sender<CoreEvent>; EventChannel::COUNT],
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (all, _) = broadcast::channel(capacity);
        let channels = std::array::from_fn(|_| broadcast::channel(capacity).0);
        Self { all, channels }
    }

    /// Number of receivers reached. Errors only when nobody is listening, which
    /// publishers ignore with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        let channel = event.channel();
        trace!(
            channel = %channel,
            severity = ?event.severity(),
            "{}",
            event.description()
        );

        let on_channel = self.channels[channel.index()]
            .send(event.clone())
            .unwrap_or(0);
        match self.all.send(event) {
            Ok(reached) => Ok(reached + on_channel),
            Err(_) if on_channel > 0 => Ok(on_channel),
            Err(e) => Err(e),
        }
    }

    /// Raw receiver for every event, in emission order.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.all.subscribe()
    }

    /// Subscription to a single channel. It only lags on that channel's traffic.
    pub fn subscribe_channel(&self, channel: EventChannel) -> Subscription {
        Subscription {
            channel,
            receiver: Some(self.channels[channel.index()].subscribe()),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.all.receiver_count()
            + self
                .channels
                .iter()
                .map(broadcast::Sender::receiver_count)
                .sum::<usize>()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Channel Subscription
// ============================================================================

/// Handle for one channel of the bus.
///
/// Dropping the handle or calling [`unsubscribe`](Self::unsubscribe) detaches
/// it. Receiving after unsubscribe yields `RecvError::Closed`.
pub struct Subscription {
    channel: EventChannel,
    receiver: Option<Receiver<CoreEvent>>,
}

impl Subscription {
    pub fn channel(&self) -> EventChannel {
        self.channel
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Detach from the bus. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        self.receiver = None;
    }

    /// Next event on this channel.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        let receiver = self.receiver.as_mut().ok_or(RecvError::Closed)?;
        receiver.recv().await
    }

    /// Next buffered event on this channel, or `None` if nothing is waiting.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Some(Err(RecvError::Closed));
        };
        match receiver.try_recv() {
            Ok(event) => Some(Ok(event)),
            Err(broadcast::error::TryRecvError::Empty) => None,
            Err(broadcast::error::TryRecvError::Lagged(n)) => Some(Err(RecvError::Lagged(n))),
            Err(broadcast::error::TryRecvError::Closed) => Some(Err(RecvError::Closed)),
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// Receiver with an optional predicate.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}
