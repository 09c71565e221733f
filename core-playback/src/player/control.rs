//! Public control surface and the item loading path shared with the
//! transitions.

use bridge_traits::LoadOptions;
use core_runtime::events::{PlaybackState, PlayerNotification};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{AudioPlayer, Inner, PlayerCore};
use crate::config::BufferingStrategy;
use crate::error::{PlaybackError, Result};
use crate::item::{AudioQuality, PlayableItem};
use crate::producer::EventProducer;
use crate::queue::{PlayerMode, QueueManager};

impl AudioPlayer {
    /// Replace the queue with `items` and start playing `items[start_index]`.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidArgument`] when `items` is empty or
    /// `start_index` is out of range. The player is stopped and the queue
    /// cleared in that case.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn play(&self, items: Vec<Arc<PlayableItem>>, start_index: usize) -> Result<()> {
        let mut core = self.inner.core.lock().await;
        self.inner.play_queue(&mut core, items, start_index).await
    }

    /// Play a single item, replacing the queue.
    pub async fn play_item(&self, item: Arc<PlayableItem>) -> Result<()> {
        self.play(vec![item], 0).await
    }

    /// Append `items` to the queue; starts playing them when there is none.
    pub async fn add(&self, items: Vec<Arc<PlayableItem>>) -> Result<()> {
        let mut core = self.inner.core.lock().await;
        match core.queue.as_mut() {
            Some(queue) => {
                queue.add(items);
                Ok(())
            }
            None => self.inner.play_queue(&mut core, items, 0).await,
        }
    }

    /// Remove the item at `index` (display order) and forget its prepared
    /// assets.
    pub async fn remove_at(&self, index: usize) -> Option<Arc<PlayableItem>> {
        let mut core = self.inner.core.lock().await;
        let removed = core.queue.as_mut()?.remove_at(index)?;
        for url in removed.urls() {
            self.inner.cache.invalidate(url);
        }
        Some(removed)
    }

    /// Resume playback.
    ///
    /// From `Failed` the current item is reloaded at its last position.
    /// While waiting for the connection only the intent to play is recorded.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::NoItemLoaded`] when nothing is loaded.
    #[instrument(skip(self))]
    pub async fn resume(&self) -> Result<()> {
        let mut core = self.inner.core.lock().await;
        if core.current_item.is_none() {
            return Err(PlaybackError::NoItemLoaded);
        }
        match core.state {
            PlaybackState::Failed => {
                core.failed_error = None;
                self.inner.reload_current_item(&mut core).await;
            }
            PlaybackState::WaitingForConnection => {
                core.state_when_connection_lost = Some(PlaybackState::Playing);
                self.inner.retry_events.start().await;
            }
            _ => self.inner.resume_playback(&mut core).await,
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn pause(&self) {
        let mut core = self.inner.core.lock().await;
        self.inner.pause_playback(&mut core).await;
    }

    /// Stop playback and clear the queue.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let mut core = self.inner.core.lock().await;
        self.inner.stop_playback(&mut core).await;
    }

    /// Advance to the next item per mode. Stops (and returns `None`) at the
    /// end of the queue.
    #[instrument(skip(self))]
    pub async fn next(&self) -> Option<Arc<PlayableItem>> {
        let mut core = self.inner.core.lock().await;
        self.inner.next_or_stop(&mut core).await;
        core.current_item.clone()
    }

    /// Go back to the previous item per mode. No-op at the start of the
    /// queue.
    #[instrument(skip(self))]
    pub async fn previous(&self) -> Option<Arc<PlayableItem>> {
        let mut core = self.inner.core.lock().await;
        let previous = core.queue.as_mut()?.previous_item()?;
        self.inner.set_current_item(&mut core, previous.clone()).await;
        Some(previous)
    }

    /// Advance to the next item, or stop when there is none.
    pub async fn next_or_stop(&self) {
        let mut core = self.inner.core.lock().await;
        self.inner.next_or_stop(&mut core).await;
    }

    /// Change the playback rate; applied right away while playing.
    pub async fn set_rate(&self, rate: f32) -> Result<()> {
        if !(rate > 0.0 && rate.is_finite()) {
            return Err(PlaybackError::InvalidArgument(format!(
                "invalid playback rate {}",
                rate
            )));
        }
        let mut core = self.inner.core.lock().await;
        core.rate = rate;
        if core.state.is_playing() {
            if let Err(e) = self.inner.engine.play(rate).await {
                warn!(error = %e, "Failed to apply rate");
            }
        }
        Ok(())
    }

    pub async fn set_mode(&self, mode: PlayerMode) {
        let mut core = self.inner.core.lock().await;
        core.mode = mode;
        if let Some(queue) = core.queue.as_mut() {
            queue.set_mode(mode);
        }
        debug!(?mode, "Mode changed");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn state(&self) -> PlaybackState {
        self.inner.core.lock().await.state
    }

    pub async fn current_item(&self) -> Option<Arc<PlayableItem>> {
        self.inner.core.lock().await.current_item.clone()
    }

    pub async fn mode(&self) -> PlayerMode {
        self.inner.core.lock().await.mode
    }

    pub async fn rate(&self) -> f32 {
        self.inner.core.lock().await.rate
    }

    pub async fn current_quality(&self) -> AudioQuality {
        self.inner.core.lock().await.current_quality
    }

    /// The error that moved the player to `Failed`, while it is there.
    pub async fn failed_error(&self) -> Option<PlaybackError> {
        self.inner.core.lock().await.failed_error.clone()
    }

    pub async fn has_next(&self) -> bool {
        let core = self.inner.core.lock().await;
        core.queue.as_ref().is_some_and(|queue| queue.has_next())
    }

    pub async fn has_previous(&self) -> bool {
        let core = self.inner.core.lock().await;
        core.queue.as_ref().is_some_and(|queue| queue.has_previous())
    }

    /// Queue items in display order.
    pub async fn items(&self) -> Vec<Arc<PlayableItem>> {
        let core = self.inner.core.lock().await;
        core.queue
            .as_ref()
            .map(|queue| queue.items().to_vec())
            .unwrap_or_default()
    }

    /// Display-order index of the current item.
    pub async fn current_item_index_in_queue(&self) -> Option<usize> {
        let core = self.inner.core.lock().await;
        let item = core.current_item.as_ref()?;
        let queue = core.queue.as_ref()?;
        queue
            .current_index()
            .filter(|&index| Arc::ptr_eq(&queue.items()[index], item))
            .or_else(|| queue.position_of(item))
    }
}

impl Inner {
    pub(crate) async fn play_queue(
        &self,
        core: &mut PlayerCore,
        items: Vec<Arc<PlayableItem>>,
        start_index: usize,
    ) -> Result<()> {
        let mut queue = match QueueManager::new(items, core.mode, start_index) {
            Ok(queue) => queue,
            Err(e) => {
                warn!(error = %e, "Rejected queue");
                self.stop_playback(core).await;
                return Err(e);
            }
        };

        self.cache.retain_only(queue.urls());
        if let Some(seek) = core.queued_seek.take() {
            seek.cancel();
        }

        let first = queue.next_item();
        info!(count = queue.len(), "Queue replaced");
        core.queue = Some(queue);
        match first {
            Some(item) => self.set_current_item(core, item).await,
            None => self.stop_playback(core).await,
        }
        Ok(())
    }

    /// Make `item` current at the default quality and start loading it.
    pub(crate) async fn set_current_item(&self, core: &mut PlayerCore, item: Arc<PlayableItem>) {
        // Retries belong to the item being replaced.
        self.retry_events.stop();
        let quality = item.url_for(self.config.default_quality).0;
        self.load_item(core, item, quality).await;
    }

    /// Load `item` at `quality` into the engine.
    ///
    /// While offline, a remote item is not loaded: the engine is emptied and
    /// the player waits for the connection with the intent to buffer.
    ///
    /// Leaves a running retry producer alone so repeated attempts count
    /// against its budget.
    pub(crate) async fn load_item(
        &self,
        core: &mut PlayerCore,
        item: Arc<PlayableItem>,
        quality: AudioQuality,
    ) {
        debug!(item = item.id(), %quality, "Loading item");
        core.current_item = Some(Arc::clone(&item));
        core.current_quality = quality;
        core.failed_error = None;

        if let Err(e) = self.engine.pause().await {
            warn!(error = %e, "Failed to pause engine before load");
        }
        self.quality_events.reset_state();
        if let Err(e) = self.engine.set_session_active(true).await {
            warn!(error = %e, "Failed to activate audio session");
        }

        if !self.is_online() && !item.is_offline(quality) {
            // Nothing of the previous item may answer for this one.
            self.player_events.stop();
            if let Err(e) = self.engine.unload().await {
                warn!(error = %e, "Failed to unload engine");
            }
            core.load_deferred = true;
            core.state_when_connection_lost = Some(PlaybackState::Buffering);
            self.record_connection_loss(core);
            self.set_state(core, PlaybackState::WaitingForConnection);
            self.begin_background_task(core);
            return;
        }

        core.load_deferred = false;
        core.paused_for_interruption = false;
        self.set_state(core, PlaybackState::Buffering);

        let asset = self.cache.resolve(item.url_for(quality).1);
        let options = LoadOptions {
            preferred_forward_buffer_duration: self.config.preferred_forward_buffer_duration,
            automatically_waits_to_minimize_stalling: self.config.buffering_strategy
                == BufferingStrategy::Default,
        };

        // Signals of the previous item must not leak into this one.
        self.player_events.stop();
        if let Err(e) = self.engine.load(asset, options).await {
            self.fail(core, PlaybackError::from(e));
            return;
        }
        self.player_events.start().await;

        self.notify(PlayerNotification::WillStartPlaying {
            item_id: item.id().to_string(),
        });

        let started = match self.config.buffering_strategy {
            BufferingStrategy::PlayWhenBufferNotEmpty => {
                self.engine.play_immediately(core.rate).await
            }
            _ => self.engine.play(core.rate).await,
        };
        if let Err(e) = started {
            warn!(error = %e, "Engine refused to start playback");
        }
    }

    /// Load the current item again and return to where it was.
    pub(crate) async fn reload_current_item(&self, core: &mut PlayerCore) {
        let Some(item) = core.current_item.clone() else {
            return;
        };
        // A deferred item never played, whatever the engine still reports.
        let progression = if core.load_deferred {
            None
        } else {
            self.engine.current_time()
        };
        let quality = core.current_quality;
        self.load_item(core, item, quality).await;
        if let Some(position) = progression {
            self.seek_or_queue(core, position, bridge_traits::SeekTolerance::any(), None);
        }
    }

    /// Retry the current item, unless playback already recovered.
    pub(crate) async fn retry_or_play_next(&self, core: &mut PlayerCore) {
        if core.state.is_playing() {
            self.retry_events.stop();
            return;
        }
        self.reload_current_item(core).await;
    }

    pub(crate) async fn next_or_stop(&self, core: &mut PlayerCore) {
        match core.queue.as_mut().and_then(|queue| queue.next_item()) {
            Some(item) => self.set_current_item(core, item).await,
            None => self.stop_playback(core).await,
        }
    }

    pub(crate) async fn resume_playback(&self, core: &mut PlayerCore) {
        core.paused_for_interruption = false;
        if let Err(e) = self.engine.play(core.rate).await {
            warn!(error = %e, "Failed to resume engine");
        }
        // Buffering stays buffering until the engine reports it can play.
        if !core.state.is_playing() && !core.state.is_buffering() {
            self.set_state(core, PlaybackState::Playing);
        }
        self.retry_events.start().await;
    }

    pub(crate) async fn pause_playback(&self, core: &mut PlayerCore) {
        if core.current_item.is_none() {
            return;
        }
        if let Err(e) = self.engine.pause().await {
            warn!(error = %e, "Failed to pause engine");
        }
        self.set_state(core, PlaybackState::Paused);
        self.retry_events.stop();
        // Keeps buffering alive when the host backgrounds the app.
        self.begin_background_task(core);
    }

    pub(crate) async fn stop_playback(&self, core: &mut PlayerCore) {
        self.retry_events.stop();
        self.player_events.stop();
        if core.current_item.take().is_some() {
            if let Err(e) = self.engine.pause().await {
                warn!(error = %e, "Failed to pause engine");
            }
            if let Err(e) = self.engine.unload().await {
                warn!(error = %e, "Failed to unload engine");
            }
        }
        core.queue = None;
        if let Some(seek) = core.queued_seek.take() {
            seek.cancel();
        }
        core.state_before_buffering = None;
        core.state_when_connection_lost = None;
        core.connection_lost_at = None;
        core.load_deferred = false;
        core.paused_for_interruption = false;
        core.quality_is_being_changed = false;

        if let Err(e) = self.engine.set_session_active(false).await {
            warn!(error = %e, "Failed to deactivate audio session");
        }
        self.set_state(core, PlaybackState::Stopped);
        self.end_background_task(core);
    }

    /// Move to `Failed`, keeping `error` for inspection.
    pub(crate) fn fail(&self, core: &mut PlayerCore, error: PlaybackError) {
        warn!(error = %error, "Playback failed");
        core.failed_error = Some(error.clone());
        if let Some(seek) = core.queued_seek.take() {
            seek.cancel();
        }
        self.set_state(core, PlaybackState::Failed);
        self.notify(PlayerNotification::Failed {
            item_id: core.current_item_id(),
            message: error.to_string(),
            recoverable: false,
        });
    }
}
