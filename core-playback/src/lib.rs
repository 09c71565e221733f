//! # Playback Orchestration
//!
//! Drives a host media engine through a queue of playable items.
//!
//! ## Overview
//!
//! This crate handles:
//! - Queue management with repeat and shuffle modes
//! - Asset preparation and preloading of the upcoming item
//! - Event producers for engine signals, connectivity, retries and
//!   automatic quality adjustment
//! - The playback state machine ([`AudioPlayer`])
//! - Routing host remote commands to the player ([`RemoteControlBridge`])
//!
//! Platform capabilities (engine, network monitor, background grants, remote
//! command surface, clock) come from `bridge-traits` and are wired through
//! [`core_runtime::config::CoreConfig`].

pub mod cache;
pub mod config;
pub mod error;
pub mod item;
pub mod player;
pub mod producer;
pub mod queue;
pub mod remote;

pub use cache::AssetCache;
pub use config::{BufferingStrategy, PlayerConfig};
pub use error::{PlaybackError, Result};
pub use item::{AudioQuality, ItemMetadata, PlayableItem};
pub use player::{AudioPlayer, SeekCompletion, WeakAudioPlayer};
pub use queue::{PlayerMode, QueueManager, RepeatMode};
pub use remote::RemoteControlBridge;

pub use core_runtime::events::{PlaybackState, PlayerNotification};
