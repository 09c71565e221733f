//! # Player Configuration
//!
//! Policy knobs of the playback state machine: rate, buffering strategy,
//! resume policies, retry policy and automatic quality adjustment.

use crate::item::AudioQuality;
use crate::queue::PlayerMode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// When playback starts after an item was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferingStrategy {
    /// Let the engine decide (it waits to minimize stalling).
    #[default]
    Default,
    /// Start as soon as any data is buffered.
    PlayWhenBufferNotEmpty,
    /// Start once `preferred_buffer_duration_before_playback` is buffered ahead.
    PlayWhenPreferredBufferDurationFull,
}

/// Player configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Rate applied whenever the player plays.
    ///
    /// Default: 1.0.
    #[serde(default = "default_rate")]
    pub rate: f32,

    #[serde(default)]
    pub buffering_strategy: BufferingStrategy,

    /// Buffered-ahead duration required by
    /// [`BufferingStrategy::PlayWhenPreferredBufferDurationFull`].
    ///
    /// Default: 60 seconds.
    #[serde(default = "default_preferred_buffer_duration_before_playback")]
    pub preferred_buffer_duration_before_playback: Duration,

    /// Forward buffer hint passed to the engine on load. `None` lets the
    /// engine choose.
    #[serde(default)]
    pub preferred_forward_buffer_duration: Option<Duration>,

    /// Resume once a system interruption ends (when the system allows it).
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub resume_after_interruption: bool,

    /// Resume once connectivity returns.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub resume_after_connection_loss: bool,

    /// Connection losses longer than this are not resumed automatically.
    ///
    /// Default: 60 seconds.
    #[serde(default = "default_maximum_connection_loss_time")]
    pub maximum_connection_loss_time: Duration,

    /// Interval between two retry ticks.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_retry_timeout")]
    pub retry_timeout: Duration,

    /// Retry ticks before the failure is reported.
    ///
    /// Default: 10.
    #[serde(default = "default_maximum_retry_count")]
    pub maximum_retry_count: u32,

    /// Switch source quality automatically on repeated interruptions.
    ///
    /// Default: true.
    #[serde(default = "default_true")]
    pub adjust_quality_automatically: bool,

    /// Interruptions within one interval that trigger a quality downgrade.
    ///
    /// Default: 5.
    #[serde(default = "default_adjust_quality_after_interruption_count")]
    pub adjust_quality_after_interruption_count: u32,

    /// Interruption-free interval after which quality is upgraded.
    ///
    /// Default: 10 minutes.
    #[serde(default = "default_adjust_quality_time_interval")]
    pub adjust_quality_time_interval: Duration,

    /// Quality used when an item starts.
    #[serde(default)]
    pub default_quality: AudioQuality,

    /// Initial repeat/shuffle mode.
    #[serde(default)]
    pub mode: PlayerMode,

    /// How often the engine is expected to tick progress. Informational for
    /// engine implementations.
    ///
    /// Default: 1 second.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            buffering_strategy: BufferingStrategy::default(),
            preferred_buffer_duration_before_playback:
                default_preferred_buffer_duration_before_playback(),
            preferred_forward_buffer_duration: None,
            resume_after_interruption: true,
            resume_after_connection_loss: true,
            maximum_connection_loss_time: default_maximum_connection_loss_time(),
            retry_timeout: default_retry_timeout(),
            maximum_retry_count: default_maximum_retry_count(),
            adjust_quality_automatically: true,
            adjust_quality_after_interruption_count:
                default_adjust_quality_after_interruption_count(),
            adjust_quality_time_interval: default_adjust_quality_time_interval(),
            default_quality: AudioQuality::default(),
            mode: PlayerMode::default(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl PlayerConfig {
    /// Configuration for podcasts and long-form speech: buffer generously
    /// before starting and never change quality underneath the listener.
    pub fn long_form() -> Self {
        Self {
            buffering_strategy: BufferingStrategy::PlayWhenPreferredBufferDurationFull,
            preferred_buffer_duration_before_playback: Duration::from_secs(30),
            preferred_forward_buffer_duration: Some(Duration::from_secs(120)),
            adjust_quality_automatically: false,
            ..Default::default()
        }
    }

    /// Configuration for radio-like streams: start immediately, retry often.
    pub fn low_latency() -> Self {
        Self {
            buffering_strategy: BufferingStrategy::PlayWhenBufferNotEmpty,
            retry_timeout: Duration::from_secs(3),
            maximum_retry_count: 20,
            default_quality: AudioQuality::Low,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.rate > 0.0 && self.rate.is_finite()) {
            return Err("rate must be a positive, finite number".to_string());
        }

        if self.retry_timeout.is_zero() {
            return Err("retry_timeout must be > 0".to_string());
        }

        if self.maximum_retry_count == 0 {
            return Err("maximum_retry_count must be > 0".to_string());
        }

        if self.adjust_quality_after_interruption_count == 0 {
            return Err("adjust_quality_after_interruption_count must be > 0".to_string());
        }

        if self.adjust_quality_time_interval.is_zero() {
            return Err("adjust_quality_time_interval must be > 0".to_string());
        }

        Ok(())
    }
}

// ============================================================================
// Default Functions (for serde)
// ============================================================================

fn default_rate() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_preferred_buffer_duration_before_playback() -> Duration {
    Duration::from_secs(60)
}

fn default_maximum_connection_loss_time() -> Duration {
    Duration::from_secs(60)
}

fn default_retry_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_maximum_retry_count() -> u32 {
    10
}

fn default_adjust_quality_after_interruption_count() -> u32 {
    5
}

fn default_adjust_quality_time_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_progress_interval() -> Duration {
    Duration::from_secs(1)
}
