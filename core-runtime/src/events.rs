//! # Event Bus System
//!
//! Observer notifications for the playback core, delivered over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **[`PlayerNotification`]**: closed set of things an observer (UI, remote
//!   surface, analytics) may want to know about
//! - **[`EventBus`]**: cloneable broadcast sender
//! - **[`EventStream`]**: receiver wrapper with optional filtering
//!
//! ```text
//!                          emit       ┌───────────┐   subscribe   ┌──────────┐
//! ┌──────────────┐ ─────────────────> │           ├─────────────> │    UI    │
//! │ AudioPlayer  │                    │ EventBus  │               └──────────┘
//! └──────────────┘                    │ (broadcast│   subscribe   ┌──────────┐
//!                                     │  channel) ├─────────────> │  Remote  │
//!                                     └───────────┘               └──────────┘
//! ```
//!
//! ## Delivery
//!
//! Notifications are best-effort. The player never waits on observers:
//! emitting with no subscriber is not an error worth reporting, and a slow
//! subscriber receives `RecvError::Lagged(n)` instead of slowing the player
//! down. Subscribers should treat `Lagged` as recoverable and `Closed` as
//! shutdown.
//!
//! ```rust
//! use core_runtime::events::{EventBus, PlaybackState, PlayerNotification};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(PlayerNotification::StateChanged {
//!     from: PlaybackState::Stopped,
//!     to: PlaybackState::Buffering,
//! })
//! .ok();
//!
//! assert!(matches!(rx.recv().await, Ok(PlayerNotification::StateChanged { .. })));
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Progress ticks are the most frequent notification; 100 leaves room for a
/// few seconds of backlog.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Playback State
// ============================================================================

/// State of the playback state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No active engine session.
    Stopped,
    Playing,
    Paused,
    /// The engine is loading; the intended state is remembered separately.
    Buffering,
    /// Connectivity was lost while online content was playing or buffering.
    WaitingForConnection,
    /// Unrecoverable error; the error is retained for inspection.
    Failed,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackState::Paused)
    }

    pub fn is_buffering(&self) -> bool {
        matches!(self, PlaybackState::Buffering)
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, PlaybackState::Stopped)
    }

    pub fn is_waiting_for_connection(&self) -> bool {
        matches!(self, PlaybackState::WaitingForConnection)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PlaybackState::Failed)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlaybackState::Stopped => "stopped",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::WaitingForConnection => "waiting_for_connection",
            PlaybackState::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Player Notifications
// ============================================================================

/// Notification pushed to observers of the player.
///
/// Items are referred to by their identifier; observers look the item up on
/// the player when they need more than that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum PlayerNotification {
    /// The player moved between two different states.
    StateChanged {
        from: PlaybackState,
        to: PlaybackState,
    },
    /// An item is about to start playing.
    WillStartPlaying { item_id: String },
    /// Periodic progress of the current item.
    Progressed {
        item_id: String,
        time: Duration,
        /// 0 to 100; 0 while the duration is unknown.
        percentage: f64,
    },
    /// The duration of the current item became known.
    DurationFound { item_id: String, duration: Duration },
    /// Display metadata of the current item was filled from the stream.
    MetadataUpdated {
        item_id: String,
        title: Option<String>,
        artist: Option<String>,
        album: Option<String>,
    },
    /// More of the current item was buffered.
    LoadedRange {
        item_id: String,
        earliest: Duration,
        latest: Duration,
    },
    /// The current item played to its end.
    FinishedPlaying { item_id: String },
    /// A failure that observers should surface.
    Failed {
        item_id: Option<String>,
        message: String,
        /// Whether playing again may succeed without user action.
        recoverable: bool,
    },
    /// The current item switched to another source quality.
    QualityChanged { item_id: String, quality: String },
}

impl PlayerNotification {
    /// Returns a human-readable description of the notification.
    pub fn description(&self) -> &str {
        match self {
            PlayerNotification::StateChanged { .. } => "Playback state changed",
            PlayerNotification::WillStartPlaying { .. } => "Item will start playing",
            PlayerNotification::Progressed { .. } => "Playback progressed",
            PlayerNotification::DurationFound { .. } => "Item duration found",
            PlayerNotification::MetadataUpdated { .. } => "Item metadata updated",
            PlayerNotification::LoadedRange { .. } => "Loaded range extended",
            PlayerNotification::FinishedPlaying { .. } => "Item finished playing",
            PlayerNotification::Failed { .. } => "Playback failed",
            PlayerNotification::QualityChanged { .. } => "Item quality changed",
        }
    }

    /// Returns the severity level of the notification.
    pub fn severity(&self) -> EventSeverity {
        match self {
            PlayerNotification::Failed {
                recoverable: false, ..
            } => EventSeverity::Error,
            PlayerNotification::Failed { .. } => EventSeverity::Warning,
            PlayerNotification::StateChanged { .. }
            | PlayerNotification::WillStartPlaying { .. }
            | PlayerNotification::FinishedPlaying { .. }
            | PlayerNotification::QualityChanged { .. } => EventSeverity::Info,
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
// Event Bus
// ============================================================================

/// Broadcast channel for [`PlayerNotification`]s.
///
/// Cloning is cheap; all clones publish into the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PlayerNotification>,
}

impl EventBus {
    /// Creates a bus retaining at most `capacity` undelivered notifications
    /// per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a notification.
    ///
    /// Returns the number of subscribers reached, or an error when nobody is
    /// subscribed. Callers that only inform observers ignore the error.
    pub fn emit(
        &self,
        notification: PlayerNotification,
    ) -> Result<usize, SendError<PlayerNotification>> {
        self.sender.send(notification)
    }

    pub fn subscribe(&self) -> Receiver<PlayerNotification> {
        self.sender.subscribe()
    }

    /// Subscribe through an [`EventStream`].
    pub fn stream(&self) -> EventStream {
        EventStream::new(self.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
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
// Event Stream Wrapper
// ============================================================================

type NotificationFilter = Box<dyn Fn(&PlayerNotification) -> bool + Send + Sync>;

/// Receiver that skips notifications rejected by a filter.
pub struct EventStream {
    receiver: Receiver<PlayerNotification>,
    filter: Option<NotificationFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<PlayerNotification>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only yield notifications matching `predicate`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&PlayerNotification) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, notification: &PlayerNotification) -> bool {
        self.filter.as_ref().map_or(true, |f| f(notification))
    }

    pub async fn recv(&mut self) -> Result<PlayerNotification, RecvError> {
        loop {
            let notification = self.receiver.recv().await?;
            if self.accepts(&notification) {
                return Ok(notification);
            }
        }
    }

    /// Non-blocking receive; `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<PlayerNotification, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(notification) => {
                    if self.accepts(&notification) {
                        return Some(Ok(notification));
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
