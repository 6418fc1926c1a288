//! # Event Bus System
//!
//! Broadcasts state changes from the core to the host UI using
//! `tokio::sync::broadcast`. The overlay, popup and options page subscribe and
//! refresh when settings change, savings are flushed, or watch sessions are
//! recorded.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   emit   ┌───────────┐
//! │ Settings service ├─────────>│           │   subscribe   ┌──────────┐
//! └──────────────────┘          │ EventBus  ├──────────────>│ Overlay  │
//! ┌──────────────────┐   emit   │ (broadcast│               └──────────┘
//! │ Savings tracker  ├─────────>│  channel) │   subscribe   ┌──────────┐
//! └──────────────────┘          │           ├──────────────>│ Popup    │
//! ┌──────────────────┐   emit   │           │               └──────────┘
//! │ Watch recorder   ├─────────>│           │
//! └──────────────────┘          └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SavingsEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Savings(SavingsEvent::Flushed {
//!         amount: 1.5,
//!         global_total: 301.5,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Time saved flushed to storage");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it can keep
//!   receiving.
//! - **`RecvError::Closed`**: every sender was dropped; treat as shutdown.
//!
//! Emitting with no subscribers returns an error that publishers ignore: the
//! core runs fine without a UI attached.

use bridge_traits::StorageTier;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published through the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Persisted settings changed
    Settings(SettingsEvent),
    /// Time-saved accounting
    Savings(SavingsEvent),
    /// Watch-session recording
    Watch(WatchEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Settings(e) => e.description(),
            CoreEvent::Savings(e) => e.description(),
            CoreEvent::Watch(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Settings(SettingsEvent::WriteFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Settings(SettingsEvent::Imported { .. })
            | CoreEvent::Settings(SettingsEvent::Reset { .. }) => EventSeverity::Info,
            CoreEvent::Watch(WatchEvent::SessionCommitted { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Settings Events
// ============================================================================

/// What a reset touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetScope {
    /// Global time saved set back to zero
    TimeSaved,
    /// Watch-session history emptied
    WatchHistory,
    /// Every setting back to its default
    All,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SettingsEvent {
    /// A key was written by an explicit user action.
    Changed { key: String },
    /// Read-through reconciliation rewrote diverging tiers.
    Healed { key: String, tiers: Vec<StorageTier> },
    /// No tier accepted a write.
    WriteFailed { key: String, message: String },
    /// A backup snapshot replaced the statistics.
    Imported { global: f64, sessions: usize },
    /// A reset action completed.
    Reset { scope: ResetScope },
}

impl SettingsEvent {
    pub fn description(&self) -> &str {
        match self {
            SettingsEvent::Changed { .. } => "Setting changed",
            SettingsEvent::Healed { .. } => "Setting reconciled across storage tiers",
            SettingsEvent::WriteFailed { .. } => "Setting could not be persisted",
            SettingsEvent::Imported { .. } => "Statistics imported",
            SettingsEvent::Reset { .. } => "Settings reset",
        }
    }
}

// ============================================================================
// Savings Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SavingsEvent {
    /// Tracking began for a player.
    TrackingStarted,
    /// Tracking stopped; `session_total` is the savings since it started.
    TrackingStopped { session_total: f64 },
    /// Pending savings were added to the persisted total.
    Flushed { amount: f64, global_total: f64 },
}

impl SavingsEvent {
    pub fn description(&self) -> &str {
        match self {
            SavingsEvent::TrackingStarted => "Time-saved tracking started",
            SavingsEvent::TrackingStopped { .. } => "Time-saved tracking stopped",
            SavingsEvent::Flushed { .. } => "Time saved flushed to storage",
        }
    }
}

// ============================================================================
// Watch Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum WatchEvent {
    SessionStarted { content_id: String },
    /// Session was long enough and appended to history.
    SessionCommitted { content_id: String, duration_ms: i64 },
    /// Session ended below the minimum duration.
    SessionDiscarded { content_id: String, duration_ms: i64 },
}

impl WatchEvent {
    pub fn description(&self) -> &str {
        match self {
            WatchEvent::SessionStarted { .. } => "Watch session started",
            WatchEvent::SessionCommitted { .. } => "Watch session recorded",
            WatchEvent::SessionDiscarded { .. } => "Watch session too short, discarded",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus yields another producer on the same channel; each
/// `subscribe()` creates an independent receiver.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let watch_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Watch(_)));
/// ```
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

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
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

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
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

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn flushed(amount: f64) -> CoreEvent {
        CoreEvent::Savings(SavingsEvent::Flushed {
            amount,
            global_total: 100.0 + amount,
        })
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(flushed(1.0)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Watch(WatchEvent::SessionStarted {
            content_id: "abc".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe())
            .filter(|event| matches!(event, CoreEvent::Settings(_)));

        bus.emit(flushed(2.0)).ok();
        let changed = CoreEvent::Settings(SettingsEvent::Changed {
            key: "theme".to_string(),
        });
        bus.emit(changed.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), changed);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(flushed(i as f64)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let warn = CoreEvent::Settings(SettingsEvent::WriteFailed {
            key: "global".to_string(),
            message: "quota".to_string(),
        });
        assert_eq!(warn.severity(), EventSeverity::Warning);

        let info = CoreEvent::Watch(WatchEvent::SessionCommitted {
            content_id: "abc".to_string(),
            duration_ms: 60_000,
        });
        assert_eq!(info.severity(), EventSeverity::Info);

        assert_eq!(flushed(1.0).severity(), EventSeverity::Debug);
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Settings(SettingsEvent::Healed {
            key: "global".to_string(),
            tiers: vec![StorageTier::Primary, StorageTier::Fallback],
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Settings\""));
        assert!(json.contains("\"primary\""));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());
        assert!(stream.try_recv().is_none());

        let event = CoreEvent::Settings(SettingsEvent::Reset {
            scope: ResetScope::All,
        });
        bus.emit(event.clone()).ok();

        assert_eq!(stream.try_recv().unwrap().unwrap(), event);
    }
}
