//! Mutable state of the player, guarded by the player lock, and the small
//! helpers every transition goes through.

use bridge_traits::{BackgroundTaskId, SeekTolerance};
use chrono::{DateTime, Utc};
use core_runtime::events::{PlaybackState, PlayerNotification};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::Inner;
use crate::config::PlayerConfig;
use crate::error::PlaybackError;
use crate::item::{AudioQuality, PlayableItem};
use crate::queue::{PlayerMode, QueueManager};

/// Called once a seek settles; `true` when it completed.
pub type SeekCompletion = Box<dyn FnOnce(bool) + Send + 'static>;

/// A seek requested before the engine was ready.
pub(crate) struct QueuedSeek {
    pub(crate) position: Duration,
    pub(crate) tolerance: SeekTolerance,
    pub(crate) completion: Option<SeekCompletion>,
}

impl QueuedSeek {
    /// Drop the seek, reporting it as not completed.
    ///
    /// The completion runs on its own task, never under the player lock.
    pub(crate) fn cancel(self) {
        if let Some(completion) = self.completion {
            tokio::spawn(async move { completion(false) });
        }
    }
}

impl fmt::Debug for QueuedSeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedSeek")
            .field("position", &self.position)
            .field("tolerance", &self.tolerance)
            .field("has_completion", &self.completion.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct PlayerCore {
    pub(crate) state: PlaybackState,
    /// State to return to once buffering ends.
    pub(crate) state_before_buffering: Option<PlaybackState>,
    /// State to return to once connectivity is back.
    pub(crate) state_when_connection_lost: Option<PlaybackState>,
    pub(crate) failed_error: Option<PlaybackError>,
    pub(crate) queue: Option<QueueManager>,
    pub(crate) current_item: Option<Arc<PlayableItem>>,
    pub(crate) current_quality: AudioQuality,
    pub(crate) mode: PlayerMode,
    pub(crate) rate: f32,
    pub(crate) queued_seek: Option<QueuedSeek>,
    pub(crate) paused_for_interruption: bool,
    pub(crate) quality_is_being_changed: bool,
    /// The current item was made current while offline and never reached
    /// the engine.
    pub(crate) load_deferred: bool,
    pub(crate) background_task: Option<BackgroundTaskId>,
    pub(crate) connection_lost_at: Option<DateTime<Utc>>,
}

impl PlayerCore {
    pub(crate) fn new(config: &PlayerConfig) -> Self {
        Self {
            state: PlaybackState::Stopped,
            state_before_buffering: None,
            state_when_connection_lost: None,
            failed_error: None,
            queue: None,
            current_item: None,
            current_quality: config.default_quality,
            mode: config.mode,
            rate: config.rate,
            queued_seek: None,
            paused_for_interruption: false,
            quality_is_being_changed: false,
            load_deferred: false,
            background_task: None,
            connection_lost_at: None,
        }
    }

    /// Whether playback should (re)start once the engine can play: nothing
    /// the listener did asked for a pause.
    pub(crate) fn should_resume_playing(&self) -> bool {
        !self.state.is_paused()
            && !self
                .state_when_connection_lost
                .is_some_and(|state| state.is_paused())
            && !self
                .state_before_buffering
                .is_some_and(|state| state.is_paused())
    }

    pub(crate) fn current_item_id(&self) -> Option<String> {
        self.current_item.as_ref().map(|item| item.id().to_string())
    }
}

impl Inner {
    /// Move to `state`, notifying observers on an actual change.
    ///
    /// Entering `Buffering` takes a background grant; leaving it returns the
    /// grant.
    pub(crate) fn set_state(&self, core: &mut PlayerCore, state: PlaybackState) {
        let from = core.state;
        if from == state {
            return;
        }
        core.state = state;
        debug!(%from, to = %state, "State changed");

        if state.is_buffering() {
            self.begin_background_task(core);
        } else if from.is_buffering() {
            self.end_background_task(core);
        }

        self.notify(PlayerNotification::StateChanged { from, to: state });
    }

    pub(crate) fn begin_background_task(&self, core: &mut PlayerCore) {
        if core.background_task.is_some() {
            return;
        }
        if let Some(host) = &self.background {
            core.background_task = host.begin_background_task();
            if core.background_task.is_none() {
                debug!("Background task refused by host");
            }
        }
    }

    pub(crate) fn end_background_task(&self, core: &mut PlayerCore) {
        if let (Some(host), Some(id)) = (&self.background, core.background_task.take()) {
            host.end_background_task(id);
        }
    }

    /// Best-effort broadcast to observers.
    pub(crate) fn notify(&self, notification: PlayerNotification) {
        self.bus.emit(notification).ok();
    }

    /// Connectivity as last seen; always online without a network monitor.
    pub(crate) fn is_online(&self) -> bool {
        self.network_events
            .as_ref()
            .map_or(true, |producer| producer.is_online())
    }

    /// Remember when connectivity went away, preferring the time the
    /// network producer saw it happen.
    pub(crate) fn record_connection_loss(&self, core: &mut PlayerCore) {
        if core.connection_lost_at.is_some() {
            return;
        }
        let lost_at = self
            .network_events
            .as_ref()
            .and_then(|network| network.connection_loss_date())
            .unwrap_or_else(|| self.clock.now());
        core.connection_lost_at = Some(lost_at);
    }

    pub(crate) fn current_item_is_offline(&self, core: &PlayerCore) -> bool {
        core.current_item
            .as_ref()
            .is_some_and(|item| item.is_offline(core.current_quality))
    }
}
