//! # Playback Error Types
//!
//! Errors surfaced by the playback core, plus the classification of errors
//! reported by the media engine.

use bridge_traits::{BridgeError, EngineError};
use thiserror::Error;

/// Errors that can occur during playback operations.
///
/// Cloneable so the player can retain the last failure for inspection while
/// also reporting it to observers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Call Boundary
    // ========================================================================
    /// Empty or out-of-range queue operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Attempted operation when no item is loaded.
    #[error("No item loaded")]
    NoItemLoaded,

    // ========================================================================
    // Engine Errors
    // ========================================================================
    /// "Not connected" / "connection lost" reported by the engine.
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// The engine stopped the item before its end while offline.
    #[error("Item ended early: {0}")]
    EarlyTermination(String),

    /// Any other engine failure.
    #[error("Unrecoverable engine error: {0}")]
    UnrecoverableEngine(String),

    /// An asset key failed to load. Never fatal by itself.
    #[error("Asset preparation failed for {url}")]
    AssetPreparationFailure { url: String },

    // ========================================================================
    // Host / Setup
    // ========================================================================
    /// A host bridge call failed.
    #[error("Bridge error: {0}")]
    Bridge(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlaybackError {
    /// Classify an error the engine attached to a finished item.
    ///
    /// Connection errors are always transient; an early end is transient only
    /// while the device is offline.
    pub fn classify(error: &EngineError, online: bool) -> Self {
        if error.is_internet_connection_error() {
            PlaybackError::TransientNetwork(error.message.clone())
        } else if error.is_ended_early() && !online {
            PlaybackError::EarlyTermination(error.message.clone())
        } else {
            PlaybackError::UnrecoverableEngine(error.message.clone())
        }
    }

    /// Returns `true` if this error is transient and playback can be retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlaybackError::TransientNetwork(_) | PlaybackError::EarlyTermination(_)
        )
    }

    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PlaybackError::TransientNetwork(_))
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(error: BridgeError) -> Self {
        PlaybackError::Bridge(error.to_string())
    }
}

impl From<core_runtime::Error> for PlaybackError {
    fn from(error: core_runtime::Error) -> Self {
        PlaybackError::Config(error.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
