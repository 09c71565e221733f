//! # Remote Control Bridge
//!
//! Connects the host's remote command surface (lock screen, headset
//! buttons, car displays) to an [`AudioPlayer`], and keeps the host's
//! now-playing information current.
//!
//! Only the command categories the host reports as supported are ever
//! registered; the set is queried once, when the bridge is created.

use bridge_traits::{
    NowPlayingInfo, RemoteCommand, RemoteCommandCenter, RemoteCommandEvent, RemoteCommandStatus,
    RemoteRepeatType, SeekPhase, SeekTolerance,
};
use core_runtime::config::CoreConfig;
use core_runtime::events::{PlayerNotification, RecvError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::player::{AudioPlayer, WeakAudioPlayer};
use crate::producer::Lifecycle;
use crate::queue::RepeatMode;

/// Distance of one remote seek step.
pub const DEFAULT_SEEK_INTERVAL: Duration = Duration::from_secs(10);

/// Routes remote commands to a player it does not own.
pub struct RemoteControlBridge {
    center: Arc<dyn RemoteCommandCenter>,
    player: WeakAudioPlayer,
    registered: Vec<RemoteCommand>,
    enabled: Mutex<HashSet<RemoteCommand>>,
    seek_interval: Duration,
    lifecycle: Lifecycle,
}

impl RemoteControlBridge {
    /// Register `commands`, keeping those the host supports.
    pub fn new(
        center: Arc<dyn RemoteCommandCenter>,
        player: &AudioPlayer,
        commands: &[RemoteCommand],
    ) -> Self {
        Self::with_player(center, player.downgrade(), commands)
    }

    /// Bridge configured from `config`, registering every supported
    /// command. `None` when remote control is disabled or no command center
    /// was provided.
    pub fn from_config(config: &CoreConfig, player: &AudioPlayer) -> Option<Self> {
        if !config.features.enable_remote_control {
            return None;
        }
        let center = config.remote_command_center.clone()?;
        Some(Self::new(center, player, &RemoteCommand::ALL))
    }

    pub(crate) fn with_player(
        center: Arc<dyn RemoteCommandCenter>,
        player: WeakAudioPlayer,
        commands: &[RemoteCommand],
    ) -> Self {
        let supported: HashSet<RemoteCommand> = center.supported_commands().into_iter().collect();
        let registered: Vec<RemoteCommand> = commands
            .iter()
            .copied()
            .filter(|command| supported.contains(command))
            .collect();
        debug!(
            requested = commands.len(),
            registered = registered.len(),
            "Remote commands registered"
        );

        Self {
            center,
            player,
            registered,
            enabled: Mutex::new(HashSet::new()),
            seek_interval: DEFAULT_SEEK_INTERVAL,
            lifecycle: Lifecycle::default(),
        }
    }

    pub fn with_seek_interval(mut self, interval: Duration) -> Self {
        self.seek_interval = interval;
        self
    }

    /// Commands both requested and supported by the host.
    pub fn registered_commands(&self) -> &[RemoteCommand] {
        &self.registered
    }

    pub fn is_enabled(&self, command: RemoteCommand) -> bool {
        self.enabled.lock().contains(&command)
    }

    /// Enable or disable one command. Unregistered commands are ignored.
    pub fn set_enabled(&self, command: RemoteCommand, enabled: bool) {
        if !self.registered.contains(&command) {
            debug!(?command, "Command not registered, ignored");
            return;
        }
        {
            let mut set = self.enabled.lock();
            if enabled {
                set.insert(command);
            } else {
                set.remove(&command);
            }
        }
        self.center.set_command_enabled(command, enabled);
    }

    pub fn set_all_enabled(&self, enabled: bool) {
        for command in self.registered.clone() {
            self.set_enabled(command, enabled);
        }
    }

    /// Apply one command to the player.
    pub async fn handle(&self, event: RemoteCommandEvent) -> RemoteCommandStatus {
        let Some(player) = self.player.upgrade() else {
            return RemoteCommandStatus::NoActionableNowPlayingItem;
        };
        if player.current_item().await.is_none() {
            return RemoteCommandStatus::NoActionableNowPlayingItem;
        }
        if !self.is_enabled(event.category()) {
            debug!(command = ?event.category(), "Command disabled");
            return RemoteCommandStatus::CommandFailed;
        }

        let step = self.seek_interval.as_secs_f64();
        match event {
            RemoteCommandEvent::Play => return status(player.resume().await.is_ok()),
            RemoteCommandEvent::Pause => player.pause().await,
            RemoteCommandEvent::TogglePlayPause => {
                if player.state().await.is_playing() {
                    player.pause().await;
                } else {
                    return status(player.resume().await.is_ok());
                }
            }
            RemoteCommandEvent::Stop => player.stop().await,
            RemoteCommandEvent::NextTrack => {
                player.next().await;
            }
            RemoteCommandEvent::PreviousTrack => {
                player.previous().await;
            }
            RemoteCommandEvent::SkipForward(interval) => {
                player.seek_to_relative_time(interval.as_secs_f64()).await;
            }
            RemoteCommandEvent::SkipBackward(interval) => {
                player.seek_to_relative_time(-interval.as_secs_f64()).await;
            }
            RemoteCommandEvent::SeekForward(SeekPhase::Begin) => {
                player.seek_to_relative_time(step).await;
            }
            RemoteCommandEvent::SeekBackward(SeekPhase::Begin) => {
                player.seek_to_relative_time(-step).await;
            }
            RemoteCommandEvent::SeekForward(SeekPhase::End)
            | RemoteCommandEvent::SeekBackward(SeekPhase::End) => {}
            RemoteCommandEvent::ChangePlaybackRate(rate) => {
                return status(player.set_rate(rate).await.is_ok());
            }
            RemoteCommandEvent::ChangePlaybackPosition(position) => {
                player.seek(position, SeekTolerance::any(), None).await;
            }
            RemoteCommandEvent::ChangeRepeatMode(repeat) => {
                let mode = player.mode().await;
                player.set_mode(mode.with_repeat(repeat_mode(repeat))).await;
            }
            RemoteCommandEvent::ChangeShuffleMode(shuffle) => {
                let mode = player.mode().await;
                player.set_mode(mode.with_shuffle(shuffle)).await;
            }
            RemoteCommandEvent::Rate(_)
            | RemoteCommandEvent::Like
            | RemoteCommandEvent::Dislike
            | RemoteCommandEvent::Bookmark => return RemoteCommandStatus::CommandFailed,
        }
        RemoteCommandStatus::Success
    }

    /// Publish what the player is playing, or clear it when idle.
    pub async fn update_now_playing(&self) {
        let info = match self.player.upgrade() {
            Some(player) => now_playing_info(&player).await,
            None => None,
        };
        self.center.update_now_playing(info);
    }

    /// Enable the registered commands and start applying incoming commands.
    ///
    /// Now-playing information follows player notifications while started.
    pub async fn start(self: &Arc<Self>) {
        let Some(player) = self.player.upgrade() else {
            warn!("Player gone, remote control not started");
            return;
        };
        let Some((generation, token)) = self.lifecycle.begin() else {
            return;
        };

        let mut commands = match self.center.subscribe_commands().await {
            Ok(commands) => commands,
            Err(e) => {
                warn!(error = %e, "Remote command subscription failed");
                self.lifecycle.finish(generation);
                return;
            }
        };
        let mut notifications = player.subscribe();
        drop(player);

        self.set_all_enabled(true);
        self.update_now_playing().await;
        info!(commands = self.registered.len(), "Remote control started");

        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    command = commands.next() => {
                        let Some(command) = command else {
                            debug!("Remote command stream closed");
                            break;
                        };
                        let outcome = bridge.handle(command.clone()).await;
                        debug!(?command, ?outcome, "Remote command handled");
                    }
                    notification = notifications.recv() => match notification {
                        Ok(notification) if refreshes_now_playing(&notification) => {
                            bridge.update_now_playing().await;
                        }
                        Ok(_) | Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            bridge.lifecycle.finish(generation);
        });
    }

    /// Disable the registered commands, stop listening and clear the
    /// now-playing information.
    pub fn stop(&self) {
        if self.lifecycle.cancel() {
            info!("Remote control stopped");
        }
        self.set_all_enabled(false);
        self.center.update_now_playing(None);
    }

    pub fn is_listening(&self) -> bool {
        self.lifecycle.is_active()
    }
}

impl Drop for RemoteControlBridge {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}

fn status(success: bool) -> RemoteCommandStatus {
    if success {
        RemoteCommandStatus::Success
    } else {
        RemoteCommandStatus::CommandFailed
    }
}

fn repeat_mode(repeat: RemoteRepeatType) -> RepeatMode {
    match repeat {
        RemoteRepeatType::Off => RepeatMode::Off,
        RemoteRepeatType::One => RepeatMode::One,
        RemoteRepeatType::All => RepeatMode::All,
    }
}

fn refreshes_now_playing(notification: &PlayerNotification) -> bool {
    matches!(
        notification,
        PlayerNotification::StateChanged { .. }
            | PlayerNotification::WillStartPlaying { .. }
            | PlayerNotification::DurationFound { .. }
            | PlayerNotification::MetadataUpdated { .. }
            | PlayerNotification::QualityChanged { .. }
    )
}

async fn now_playing_info(player: &AudioPlayer) -> Option<NowPlayingInfo> {
    let item = player.current_item().await?;
    let metadata = item.metadata();
    let state = player.state().await;
    let items = player.items().await;

    Some(NowPlayingInfo {
        title: metadata.title,
        artist: metadata.artist,
        album: metadata.album,
        artwork_url: metadata.artwork_url,
        duration: player.current_item_duration().await,
        elapsed: player.current_item_progression().await,
        rate: if state.is_playing() {
            player.rate().await
        } else {
            0.0
        },
        queue_index: player.current_item_index_in_queue().await,
        queue_count: Some(items.len()),
    })
}
