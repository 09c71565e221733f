//! How producer events move the state machine.

use bridge_traits::{EngineError, SeekTolerance};
use core_runtime::events::{PlaybackState, PlayerNotification};
use tracing::{debug, info, trace, warn};

use super::{Inner, PlayerCore};
use crate::config::BufferingStrategy;
use crate::error::PlaybackError;
use crate::item::AudioQuality;
use crate::producer::{
    EventProducer, NetworkEvent, PlayerEvent, ProducerEvent, QualityAdjustmentEvent, RetryEvent,
};

impl Inner {
    pub(crate) async fn handle_event(&self, event: ProducerEvent) {
        let mut core = self.core.lock().await;
        trace!(?event, state = %core.state, "Handling event");
        match event {
            ProducerEvent::Player { generation, event } => {
                if !self.player_events.is_current(generation) {
                    trace!(generation, "Engine event of a replaced item dropped");
                    return;
                }
                self.handle_player_event(&mut core, event).await
            }
            ProducerEvent::Network(event) => self.handle_network_event(&mut core, event).await,
            ProducerEvent::Retry(event) => self.handle_retry_event(&mut core, event).await,
            ProducerEvent::Quality(event) => self.handle_quality_event(&mut core, event).await,
        }
    }

    async fn handle_player_event(&self, core: &mut PlayerCore, event: PlayerEvent) {
        let Some(item) = core.current_item.clone() else {
            trace!("No current item, engine event ignored");
            return;
        };

        match event {
            PlayerEvent::EndedPlaying(error) => self.handle_ended(core, error).await,

            PlayerEvent::InterruptionBegan
                if core.state.is_playing() || core.state.is_buffering() =>
            {
                debug!("Interruption began, pausing");
                self.begin_background_task(core);
                core.paused_for_interruption = true;
                self.pause_playback(core).await;
            }

            PlayerEvent::InterruptionEnded { should_resume } if core.paused_for_interruption => {
                debug!(should_resume, "Interruption ended");
                if self.config.resume_after_interruption && should_resume {
                    self.resume_playback(core).await;
                }
                core.paused_for_interruption = false;
                self.end_background_task(core);
            }

            PlayerEvent::LoadedDuration(duration) => {
                self.notify(PlayerNotification::DurationFound {
                    item_id: item.id().to_string(),
                    duration,
                });
            }

            PlayerEvent::LoadedMetadata(metadata) => {
                if !metadata.is_empty() && item.parse_metadata(&metadata) {
                    self.notify(PlayerNotification::MetadataUpdated {
                        item_id: item.id().to_string(),
                        title: item.title(),
                        artist: item.artist(),
                        album: item.album(),
                    });
                }
            }

            PlayerEvent::LoadedMoreRange { earliest, latest } => {
                self.notify(PlayerNotification::LoadedRange {
                    item_id: item.id().to_string(),
                    earliest,
                    latest,
                });

                // Also while playing: after a seek the engine may sit idle
                // waiting for its own buffer target.
                if self.config.buffering_strategy
                    == BufferingStrategy::PlayWhenPreferredBufferDurationFull
                    && (core.state.is_buffering() || core.state.is_playing())
                    && self.loaded_ahead().is_some_and(|ahead| {
                        ahead >= self.config.preferred_buffer_duration_before_playback
                    })
                {
                    if let Err(e) = self.engine.play_immediately(core.rate).await {
                        warn!(error = %e, "Failed to start playback");
                    }
                }
            }

            PlayerEvent::Progressed(time) => {
                if !self.engine.is_ready_to_play() {
                    return;
                }
                // The buffer-health signal is sometimes missing on first play.
                if core.state.is_buffering() || core.state.is_paused() {
                    self.apply_resume_intent(core).await;
                }

                let percentage = match self.engine.duration() {
                    Some(duration) if !duration.is_zero() => {
                        time.as_secs_f64() / duration.as_secs_f64() * 100.0
                    }
                    _ => 0.0,
                };
                self.notify(PlayerNotification::Progressed {
                    item_id: item.id().to_string(),
                    time,
                    percentage,
                });
            }

            PlayerEvent::ReadyToPlay => {
                if let Some(mut seek) = core.queued_seek.take() {
                    debug!(position = ?seek.position, "Executing queued seek");
                    seek.tolerance = SeekTolerance::zero();
                    self.spawn_seek(seek);
                }
            }

            PlayerEvent::PlaybackLikelyToKeepUp => {
                debug!(should_resume = core.should_resume_playing(), "Playback likely to keep up");
                self.apply_resume_intent(core).await;
                core.state_before_buffering = None;
                self.preload_upcoming(core);
                self.retry_events.stop();
            }

            PlayerEvent::RouteChanged => {
                // Some route changes pause the engine on their own.
                if self.engine.rate() == 0.0 {
                    self.set_state(core, PlaybackState::Paused);
                }
            }

            PlayerEvent::SessionInvalidated => {
                info!("Audio session invalidated, restarting");
                if let Err(e) = self.engine.set_session_active(true).await {
                    warn!(error = %e, "Failed to reactivate audio session");
                }
                self.set_state(core, PlaybackState::Stopped);
                self.quality_events.increment_interruption_count();
                self.retry_or_play_next(core).await;
            }

            PlayerEvent::StartedBuffering => {
                if core.state.is_playing() && !core.quality_is_being_changed {
                    self.quality_events.increment_interruption_count();
                }
                core.state_before_buffering = Some(core.state);
                if self.is_online() || self.current_item_is_offline(core) {
                    self.set_state(core, PlaybackState::Buffering);
                } else {
                    self.set_state(core, PlaybackState::WaitingForConnection);
                }
            }

            PlayerEvent::InterruptionBegan | PlayerEvent::InterruptionEnded { .. } => {}
        }
    }

    async fn handle_ended(&self, core: &mut PlayerCore, error: Option<EngineError>) {
        let online = self.is_online();
        match error {
            // Connection trouble while streaming: wait for the network.
            Some(error)
                if !self.current_item_is_offline(core)
                    && (error.is_internet_connection_error()
                        || (!online && error.is_ended_early())) =>
            {
                info!(%error, "Connection lost while playing");
                core.state_when_connection_lost = Some(PlaybackState::Playing);
                self.record_connection_loss(core);
                self.set_state(core, PlaybackState::WaitingForConnection);
                self.retry_events.start().await;
            }
            Some(error) if !error.is_ended_early() => {
                self.fail(core, PlaybackError::classify(&error, online));
            }
            _ => {
                if let Some(id) = core.current_item_id() {
                    self.notify(PlayerNotification::FinishedPlaying { item_id: id });
                }
                self.next_or_stop(core).await;
            }
        }
    }

    /// Play when nothing asked for a pause, otherwise settle in `Paused`.
    async fn apply_resume_intent(&self, core: &mut PlayerCore) {
        if core.should_resume_playing() {
            core.state_before_buffering = None;
            self.set_state(core, PlaybackState::Playing);
            if let Err(e) = self.engine.play(core.rate).await {
                warn!(error = %e, "Failed to start playback");
            }
        } else {
            if let Err(e) = self.engine.pause().await {
                warn!(error = %e, "Failed to pause engine");
            }
            self.set_state(core, PlaybackState::Paused);
        }
    }

    /// Prepare the item after the current one so it starts without delay.
    pub(crate) fn preload_upcoming(&self, core: &PlayerCore) {
        let Some(upcoming) = core.queue.as_ref().and_then(|queue| queue.upcoming_item()) else {
            return;
        };
        let url = upcoming.url_for(core.current_quality).1;
        if self.cache.contains(url) {
            return;
        }
        debug!(item = upcoming.id(), "Preloading upcoming item");
        // Completion is observed through the cache.
        drop(self.cache.preload(url));
    }

    async fn handle_network_event(&self, core: &mut PlayerCore, event: NetworkEvent) {
        match event {
            NetworkEvent::ConnectionLost => {
                if core.current_item.is_none()
                    || self.current_item_is_offline(core)
                    || core.state.is_waiting_for_connection()
                    || core.state.is_failed()
                {
                    return;
                }
                info!(state = %core.state, "Connection lost");
                core.state_when_connection_lost = Some(core.state);
                self.record_connection_loss(core);
                if core.state.is_playing() {
                    self.quality_events.increment_interruption_count();
                }
                self.set_state(core, PlaybackState::WaitingForConnection);
                self.begin_background_task(core);
            }

            NetworkEvent::ConnectionRetrieved => {
                let Some(remembered) = core.state_when_connection_lost.take() else {
                    return;
                };
                if core.current_item.is_none() {
                    return;
                }
                let within_window = core.connection_lost_at.take().map_or(true, |lost_at| {
                    self.clock.elapsed_since(lost_at) <= self.config.maximum_connection_loss_time
                });

                info!(%remembered, within_window, "Connection retrieved");
                if !self.config.resume_after_connection_loss
                    || !within_window
                    || remembered.is_stopped()
                {
                    self.end_background_task(core);
                    return;
                }

                if !core.load_deferred && self.engine.is_ready_to_play() {
                    self.set_state(core, remembered);
                    if remembered.is_playing() {
                        if let Err(e) = self.engine.play(core.rate).await {
                            warn!(error = %e, "Failed to resume after connection loss");
                        }
                    }
                    self.end_background_task(core);
                } else {
                    self.retry_or_play_next(core).await;
                    if remembered.is_paused() {
                        core.state_before_buffering = Some(remembered);
                    }
                }
            }

            NetworkEvent::NetworkChanged => debug!("Network changed"),
        }
    }

    async fn handle_retry_event(&self, core: &mut PlayerCore, event: RetryEvent) {
        match event {
            RetryEvent::RetryAvailable => {
                debug!(state = %core.state, "Retrying");
                self.retry_or_play_next(core).await;
            }
            RetryEvent::MaximumRetryCountReached => {
                warn!("Giving up on the current item");
                self.notify(PlayerNotification::Failed {
                    item_id: core.current_item_id(),
                    message: "maximum retry count reached".to_string(),
                    recoverable: true,
                });
                if core.queue.as_ref().is_some_and(|queue| queue.has_next()) {
                    self.next_or_stop(core).await;
                } else {
                    self.stop_playback(core).await;
                }
            }
        }
    }

    async fn handle_quality_event(&self, core: &mut PlayerCore, event: QualityAdjustmentEvent) {
        if !self.config.adjust_quality_automatically {
            return;
        }
        let target = match event {
            QualityAdjustmentEvent::GoDown => core.current_quality.lower(),
            QualityAdjustmentEvent::GoUp => core.current_quality.higher(),
        };
        if let Some(quality) = target {
            self.change_quality(core, quality).await;
        }
    }

    /// Switch the current item to the closest source of `quality`, keeping
    /// the position.
    async fn change_quality(&self, core: &mut PlayerCore, quality: AudioQuality) {
        let Some(item) = core.current_item.clone() else {
            return;
        };
        let (quality, url) = item.url_for(quality);
        if quality == core.current_quality || core.state.is_stopped() {
            return;
        }
        info!(item = item.id(), from = %core.current_quality, to = %quality, "Changing quality");
        debug!(url = core_runtime::logging::loggable_source(url), "New source");

        core.quality_is_being_changed = true;
        let progression = self.engine.current_time();
        self.load_item(core, item.clone(), quality).await;
        if let Some(position) = progression {
            self.seek_or_queue(core, position, SeekTolerance::any(), None);
        }
        self.notify(PlayerNotification::QualityChanged {
            item_id: item.id().to_string(),
            quality: quality.to_string(),
        });
        core.quality_is_being_changed = false;
    }
}
