//! Media engine bridge traits and supporting types.
//!
//! The media engine is the host's native playback primitive. It performs the
//! actual decode/render work and asset preparation; the core only drives it
//! through the commands below and listens to the low-level signals it pushes.
//! Every call must return promptly: preparation and seeking complete
//! asynchronously and are reported back through [`MediaAsset::load_values`],
//! the returned seek future, or the [`EngineSignalStream`].

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Engine Errors
// ============================================================================

/// Category of an error reported by the media engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineErrorKind {
    /// The device has no internet connection.
    NotConnectedToInternet,
    /// The connection dropped while the engine was loading data.
    NetworkConnectionLost,
    /// The item stopped before its expected end.
    ItemEndedEarly,
    /// Any other engine failure (decoder, format, permission...).
    Other,
}

/// Error reported by the media engine, either attached to an asset or carried
/// by an [`EngineSignal::EndedPlaying`] signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// `true` for the "not connected" / "connection lost" family.
    pub fn is_internet_connection_error(&self) -> bool {
        matches!(
            self.kind,
            EngineErrorKind::NotConnectedToInternet | EngineErrorKind::NetworkConnectionLost
        )
    }

    /// `true` when the engine stopped the item before its end.
    pub fn is_ended_early(&self) -> bool {
        self.kind == EngineErrorKind::ItemEndedEarly
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EngineError {}

// ============================================================================
// Assets
// ============================================================================

/// Property of an asset the engine loads before the asset can be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetKey {
    /// The track list of the asset.
    Tracks,
    /// Whether the asset can be played at all.
    Playable,
}

impl AssetKey {
    /// Keys that must load before an asset is considered ready.
    pub const REQUIRED: [AssetKey; 2] = [AssetKey::Tracks, AssetKey::Playable];
}

/// Loading status of a single [`AssetKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetKeyStatus {
    Unknown,
    Loading,
    Loaded,
    Failed,
    Cancelled,
}

impl AssetKeyStatus {
    /// `true` for statuses that can never turn into `Loaded`.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, AssetKeyStatus::Failed | AssetKeyStatus::Cancelled)
    }
}

/// Opaque engine handle for a prepared source URL.
///
/// Statuses are live: an asset returned as "loading" may report `Failed`
/// later, so callers must re-check on every use.
#[async_trait::async_trait]
pub trait MediaAsset: Send + Sync {
    /// Source URL this asset was prepared from.
    fn url(&self) -> &str;

    /// Current loading status of `key`.
    fn status_of(&self, key: AssetKey) -> AssetKeyStatus;

    /// Asset-level error, if the engine attached one.
    fn error(&self) -> Option<EngineError> {
        None
    }

    /// Resolves once every key in `keys` reached a settled status
    /// (`Loaded`, `Failed` or `Cancelled`).
    async fn load_values(&self, keys: &[AssetKey]);
}

impl fmt::Debug for dyn MediaAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAsset").field("url", &self.url()).finish()
    }
}

// ============================================================================
// Playback Types
// ============================================================================

/// Closed time range in seconds-based [`Duration`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub earliest: Duration,
    pub latest: Duration,
}

impl TimeRange {
    pub fn new(earliest: Duration, latest: Duration) -> Self {
        Self { earliest, latest }
    }

    pub fn contains(&self, time: Duration) -> bool {
        self.earliest <= time && time <= self.latest
    }
}

/// How far the engine may land from the requested seek target.
///
/// `None` means unbounded (the engine picks the most efficient position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeekTolerance {
    pub before: Option<Duration>,
    pub after: Option<Duration>,
}

impl SeekTolerance {
    /// Unbounded tolerance on both sides.
    pub fn any() -> Self {
        Self::default()
    }

    /// Exact-time seek.
    pub fn zero() -> Self {
        Self {
            before: Some(Duration::ZERO),
            after: Some(Duration::ZERO),
        }
    }

    pub fn is_exact(&self) -> bool {
        self.before == Some(Duration::ZERO) && self.after == Some(Duration::ZERO)
    }
}

/// Options applied when an asset is loaded into the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadOptions {
    /// How much media the engine should try to keep buffered ahead.
    pub preferred_forward_buffer_duration: Option<Duration>,
    /// Whether the engine may delay the start of playback to avoid stalls.
    pub automatically_waits_to_minimize_stalling: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            preferred_forward_buffer_duration: None,
            automatically_waits_to_minimize_stalling: true,
        }
    }
}

/// Single metadata entry discovered inside a stream (ID3 frame, ICY header,
/// container atom...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataItem {
    /// Common key such as `title`, `artist`, `albumName`, `trackNumber`.
    pub key: String,
    pub value: String,
}

impl MetadataItem {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Buffer health reported by the engine for the loaded item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferStatus {
    /// The playback buffer ran dry; the engine is loading.
    Empty,
    /// Enough data is buffered to keep playing without interruption.
    LikelyToKeepUp,
}

/// Low-level signal pushed by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineSignal {
    /// Periodic playback position tick.
    Progressed(Duration),
    /// Duration of the loaded item became known.
    DurationLoaded(Duration),
    /// Timed metadata was discovered in the stream.
    MetadataLoaded(Vec<MetadataItem>),
    /// The loaded time range was extended.
    LoadedRangeExtended(TimeRange),
    /// The loaded item became ready to play.
    ReadyToPlay,
    /// Buffer health changed.
    BufferStatusChanged(BufferStatus),
    /// The audio output route changed (headphones unplugged, ...).
    RouteChanged,
    /// The platform audio session was reset by the system.
    SessionInvalidated,
    /// The item ended, optionally because of an error.
    EndedPlaying(Option<EngineError>),
    /// A system interruption (call, alarm...) started.
    InterruptionBegan,
    /// A system interruption ended.
    InterruptionEnded { should_resume: bool },
}

/// Stream of engine signals, in emission order.
#[async_trait::async_trait]
pub trait EngineSignalStream: Send {
    /// Next signal; `None` once the engine closed the stream.
    async fn next(&mut self) -> Option<EngineSignal>;
}

// ============================================================================
// Media Engine
// ============================================================================

/// Host media engine driven by the playback core.
///
/// # Platform Support
///
/// - **iOS / macOS**: AVFoundation player wrapper
/// - **Android**: ExoPlayer / Media3 wrapper
/// - **Desktop**: GStreamer, or a symphonia + cpal pipeline
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync {
    /// Create a handle for `url` and start preparing it. Returns immediately.
    fn prepare(&self, url: &str) -> Arc<dyn MediaAsset>;

    /// Replace the engine's current item with `asset`.
    async fn load(&self, asset: Arc<dyn MediaAsset>, options: LoadOptions) -> Result<()>;

    /// Drop the current item and release its session.
    async fn unload(&self) -> Result<()>;

    /// Play the current item at `rate`, letting the engine wait for buffer.
    async fn play(&self, rate: f32) -> Result<()>;

    /// Play the current item at `rate` without waiting for buffer.
    async fn play_immediately(&self, rate: f32) -> Result<()> {
        self.play(rate).await
    }

    /// Pause the current item (rate 0).
    async fn pause(&self) -> Result<()>;

    /// Current engine rate; `0.0` when paused or stalled.
    fn rate(&self) -> f32;

    /// Seek the current item. Resolves to `true` when the seek finished,
    /// `false` when it was interrupted by another seek.
    async fn seek(&self, position: Duration, tolerance: SeekTolerance) -> Result<bool>;

    /// Current playback position of the loaded item.
    fn current_time(&self) -> Option<Duration>;

    /// Duration of the loaded item, when known.
    fn duration(&self) -> Option<Duration>;

    /// Whether the loaded item reported ready-to-play.
    fn is_ready_to_play(&self) -> bool;

    /// Latest loaded time range of the current item.
    fn loaded_range(&self) -> Option<TimeRange>;

    /// Latest seekable time range of the current item.
    fn seekable_range(&self) -> Option<TimeRange>;

    /// Activate or deactivate the platform audio session.
    async fn set_session_active(&self, active: bool) -> Result<()>;

    /// Subscribe to the engine's signal stream.
    async fn subscribe_signals(&self) -> Result<Box<dyn EngineSignalStream>>;
}
