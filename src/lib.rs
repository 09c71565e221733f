//! Workspace façade crate.
//!
//! Re-exports the host bridge contracts, the runtime infrastructure and (with
//! the default `playback` feature) the playback orchestration core, so host
//! applications can depend on a single crate.

pub use bridge_traits;
pub use core_runtime;

#[cfg(feature = "playback")]
pub use core_playback;

#[cfg(feature = "playback")]
pub use core_playback::{AudioPlayer, PlayableItem, PlaybackError, PlaybackState, PlayerConfig};
