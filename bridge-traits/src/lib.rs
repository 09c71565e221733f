//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the
//! platform. Each trait represents a capability the core drives or observes
//! but never implements itself: the native media engine, reachability,
//! background execution grants and the remote command surface.
//!
//! ## Traits
//!
//! ### Playback
//! - [`MediaEngine`](engine::MediaEngine) - Native player primitive (prepare, load, play, seek, signals)
//! - [`MediaAsset`](engine::MediaAsset) - Prepared source handle with per-key loading status
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity category and change stream
//! - [`BackgroundTaskHost`](background::BackgroundTaskHost) - Background execution grants
//! - [`RemoteCommandCenter`](remote::RemoteCommandCenter) - Lock screen / headset commands and now-playing info
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Host failures are reported with [`BridgeError`](error::BridgeError).
//! Errors the engine attaches to playback itself are data, not failures of
//! the call, and travel as [`EngineError`](engine::EngineError).
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` (streams require `Send`): the core
//! calls into bridges from background tasks.

pub mod background;
pub mod engine;
pub mod error;
pub mod network;
pub mod remote;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{BackgroundTaskHost, BackgroundTaskId};
pub use engine::{
    AssetKey, AssetKeyStatus, BufferStatus, EngineError, EngineErrorKind, EngineSignal,
    EngineSignalStream, LoadOptions, MediaAsset, MediaEngine, MetadataItem, SeekTolerance,
    TimeRange,
};
pub use network::{Connection, NetworkChangeStream, NetworkMonitor};
pub use remote::{
    NowPlayingInfo, RemoteCommand, RemoteCommandCenter, RemoteCommandEvent, RemoteCommandStatus,
    RemoteCommandStream, RemoteRepeatType, SeekPhase,
};
pub use time::{Clock, ConsoleLogger, LogEntry, LogLevel, LoggerSink, SystemClock};
