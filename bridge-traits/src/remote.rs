//! Remote Command Surface
//!
//! Lock screens, headsets, car head units and smart watches send transport
//! commands to the app and display what is currently playing. The host
//! exposes that surface through [`RemoteCommandCenter`]; which command
//! categories exist depends on the platform and its version, so the core
//! always asks [`RemoteCommandCenter::supported_commands`] first.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Category of remote command. One category may cover several host
/// commands (e.g. `PlayPause` covers play, pause and toggle).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteCommand {
    PlayPause,
    Stop,
    NextTrack,
    PreviousTrack,
    SkipForward,
    SkipBackward,
    SeekForward,
    SeekBackward,
    ChangePlaybackRate,
    ChangePlaybackPosition,
    Rate,
    Like,
    Dislike,
    Bookmark,
    ChangeRepeatMode,
    ChangeShuffleMode,
}

impl RemoteCommand {
    /// Every known category.
    pub const ALL: [RemoteCommand; 16] = [
        RemoteCommand::PlayPause,
        RemoteCommand::Stop,
        RemoteCommand::NextTrack,
        RemoteCommand::PreviousTrack,
        RemoteCommand::SkipForward,
        RemoteCommand::SkipBackward,
        RemoteCommand::SeekForward,
        RemoteCommand::SeekBackward,
        RemoteCommand::ChangePlaybackRate,
        RemoteCommand::ChangePlaybackPosition,
        RemoteCommand::Rate,
        RemoteCommand::Like,
        RemoteCommand::Dislike,
        RemoteCommand::Bookmark,
        RemoteCommand::ChangeRepeatMode,
        RemoteCommand::ChangeShuffleMode,
    ];
}

/// Repeat setting carried by a remote repeat-mode command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteRepeatType {
    Off,
    One,
    All,
}

/// Phase of a press-and-hold seek command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeekPhase {
    Begin,
    End,
}

/// A command received from the host surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RemoteCommandEvent {
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    NextTrack,
    PreviousTrack,
    SkipForward(Duration),
    SkipBackward(Duration),
    SeekForward(SeekPhase),
    SeekBackward(SeekPhase),
    ChangePlaybackRate(f32),
    ChangePlaybackPosition(Duration),
    Rate(f32),
    Like,
    Dislike,
    Bookmark,
    ChangeRepeatMode(RemoteRepeatType),
    ChangeShuffleMode(bool),
}

impl RemoteCommandEvent {
    /// Category this event belongs to.
    pub fn category(&self) -> RemoteCommand {
        match self {
            RemoteCommandEvent::Play
            | RemoteCommandEvent::Pause
            | RemoteCommandEvent::TogglePlayPause => RemoteCommand::PlayPause,
            RemoteCommandEvent::Stop => RemoteCommand::Stop,
            RemoteCommandEvent::NextTrack => RemoteCommand::NextTrack,
            RemoteCommandEvent::PreviousTrack => RemoteCommand::PreviousTrack,
            RemoteCommandEvent::SkipForward(_) => RemoteCommand::SkipForward,
            RemoteCommandEvent::SkipBackward(_) => RemoteCommand::SkipBackward,
            RemoteCommandEvent::SeekForward(_) => RemoteCommand::SeekForward,
            RemoteCommandEvent::SeekBackward(_) => RemoteCommand::SeekBackward,
            RemoteCommandEvent::ChangePlaybackRate(_) => RemoteCommand::ChangePlaybackRate,
            RemoteCommandEvent::ChangePlaybackPosition(_) => {
                RemoteCommand::ChangePlaybackPosition
            }
            RemoteCommandEvent::Rate(_) => RemoteCommand::Rate,
            RemoteCommandEvent::Like => RemoteCommand::Like,
            RemoteCommandEvent::Dislike => RemoteCommand::Dislike,
            RemoteCommandEvent::Bookmark => RemoteCommand::Bookmark,
            RemoteCommandEvent::ChangeRepeatMode(_) => RemoteCommand::ChangeRepeatMode,
            RemoteCommandEvent::ChangeShuffleMode(_) => RemoteCommand::ChangeShuffleMode,
        }
    }
}

/// Result reported back to the host for a handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteCommandStatus {
    Success,
    NoActionableNowPlayingItem,
    CommandFailed,
}

/// Now-playing information published to the host surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NowPlayingInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub artwork_url: Option<String>,
    pub duration: Option<Duration>,
    pub elapsed: Option<Duration>,
    pub rate: f32,
    pub queue_index: Option<usize>,
    pub queue_count: Option<usize>,
}

/// Host remote command surface.
#[async_trait::async_trait]
pub trait RemoteCommandCenter: Send + Sync {
    /// Command categories available on this host at runtime.
    fn supported_commands(&self) -> Vec<RemoteCommand>;

    /// Enable or disable a command category on the host surface.
    fn set_command_enabled(&self, command: RemoteCommand, enabled: bool);

    /// Subscribe to incoming commands.
    async fn subscribe_commands(&self) -> Result<Box<dyn RemoteCommandStream>>;

    /// Publish (or clear, with `None`) the now-playing information.
    fn update_now_playing(&self, info: Option<NowPlayingInfo>);
}

/// Stream of remote command events
#[async_trait::async_trait]
pub trait RemoteCommandStream: Send {
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<RemoteCommandEvent>;
}
