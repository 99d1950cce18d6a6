//! # Event Bus System
//!
//! Provides an event-driven architecture for the session core using
//! `tokio::sync::broadcast`. Sessions publish lifecycle, playback, and
//! focus events here so hosts can observe the control layer without
//! polling it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ MusicSession ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │
//! ┌──────────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │EffectsSession├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! └──────────────┘               │           │                  └────────────┘
//!                                │           │
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │  Focus pump  ├──────────────>│           ├─────────────────>│ Subscriber │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, SessionEvent};
//! use engine_traits::MediaHandle;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(SessionEvent::PlaybackStarted {
//!         handle: MediaHandle::new(),
//!     })
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert!(matches!(event, SessionEvent::PlaybackStarted { .. }));
//! # }
//! ```
//!
//! ### Filtering Events
//!
//! ```rust
//! use core_runtime::events::{EventBus, EventStream, SessionEvent};
//!
//! let event_bus = EventBus::new(100);
//! let focus_stream = EventStream::new(event_bus.subscribe())
//!     .filter(|event| matches!(event, SessionEvent::FocusChanged { .. }));
//! ```
//!
//! ## Error Handling
//!
//! The event bus uses `tokio::sync::broadcast`, which can produce two
//! kinds of receive errors:
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//!   This is non-fatal; the subscriber can continue receiving new events.
//! - **`RecvError::Closed`**: All senders have been dropped. This indicates shutdown.
//!
//! ## Thread Safety
//!
//! The event bus is fully thread-safe (`Send + Sync`). Clone it into any
//! task that needs to publish; each `subscribe()` call creates an
//! independent receiver.

use engine_traits::{FocusChange, MediaHandle, StreamKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall more than this many events behind receive
/// `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Types
// ============================================================================

/// Events published by the session layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// A session entered the started state.
    SessionStarted {
        /// Which stream category the session manages.
        stream: StreamKind,
    },
    /// A session entered the stopped state.
    SessionStopped {
        /// Which stream category the session manages.
        stream: StreamKind,
    },
    /// A session released all of its objects and went idle.
    SessionReleased {
        /// Which stream category the session manages.
        stream: StreamKind,
    },
    /// An object began playing.
    PlaybackStarted {
        /// Engine handle of the object.
        handle: MediaHandle,
    },
    /// An object paused.
    PlaybackPaused {
        /// Engine handle of the object.
        handle: MediaHandle,
    },
    /// An object stopped.
    PlaybackStopped {
        /// Engine handle of the object.
        handle: MediaHandle,
    },
    /// An engine operation failed outside a caller's control flow,
    /// such as during a detached crossfade tail.
    PlaybackFailed {
        /// Engine handle of the object, if one was involved.
        handle: Option<MediaHandle>,
        /// Human-readable error message.
        message: String,
    },
    /// An asynchronous sample load finished.
    SampleLoaded {
        /// Engine handle of the sample.
        handle: MediaHandle,
        /// Whether the load succeeded.
        success: bool,
    },
    /// The host arbiter changed our audio focus.
    FocusChanged {
        /// Which stream category the change applies to.
        stream: StreamKind,
        /// The focus transition reported by the host.
        change: FocusChange,
    },
    /// The session lowered its master volume for a transient interruption.
    MasterDucked {
        /// Which stream category was ducked.
        stream: StreamKind,
    },
    /// The session restored its master volume after an interruption.
    MasterRaised {
        /// Which stream category was restored.
        stream: StreamKind,
    },
}

impl SessionEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            SessionEvent::SessionStarted { .. } => "Session started",
            SessionEvent::SessionStopped { .. } => "Session stopped",
            SessionEvent::SessionReleased { .. } => "Session released",
            SessionEvent::PlaybackStarted { .. } => "Playback started",
            SessionEvent::PlaybackPaused { .. } => "Playback paused",
            SessionEvent::PlaybackStopped { .. } => "Playback stopped",
            SessionEvent::PlaybackFailed { .. } => "Playback error",
            SessionEvent::SampleLoaded { .. } => "Sample load finished",
            SessionEvent::FocusChanged { .. } => "Audio focus changed",
            SessionEvent::MasterDucked { .. } => "Master volume ducked",
            SessionEvent::MasterRaised { .. } => "Master volume restored",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            SessionEvent::PlaybackFailed { .. } => EventSeverity::Error,
            SessionEvent::SampleLoaded { success: false, .. } => EventSeverity::Warning,
            SessionEvent::SessionStarted { .. }
            | SessionEvent::SessionStopped { .. }
            | SessionEvent::SessionReleased { .. }
            | SessionEvent::FocusChanged { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to session events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
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
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: SessionEvent) -> Result<usize, SendError<SessionEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<SessionEvent> {
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
type EventFilter = Box<dyn Fn(&SessionEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, SessionEvent};
///
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, SessionEvent::PlaybackFailed { .. }));
/// ```
pub struct EventStream {
    receiver: Receiver<SessionEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<SessionEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&SessionEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by
    /// `n` events. Returns `RecvError::Closed` if all senders have been
    /// dropped.
    pub async fn recv(&mut self) -> Result<SessionEvent, RecvError> {
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
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<SessionEvent, RecvError>> {
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
