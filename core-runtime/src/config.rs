//! # Core Configuration
//!
//! Dependency-injection container for the host bridges the playback core
//! drives. Hosts assemble a [`CoreConfig`] with [`CoreConfigBuilder`]; the
//! builder fails fast when a required capability is missing so the problem
//! surfaces at startup rather than on the first `play()`.
//!
//! ## Required
//! - [`MediaEngine`]
//!
//! ## Optional
//! - [`NetworkMonitor`]: without it the player assumes it is always online
//! - [`BackgroundTaskHost`]: without it background grants are skipped
//! - [`RemoteCommandCenter`]: without it no remote control bridge is created
//! - [`Clock`]: defaults to [`SystemClock`]
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .media_engine(Arc::new(MyEngine::new()))
//!     .network_monitor(Arc::new(MyReachability::new()))
//!     .enable_network_awareness(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    BackgroundTaskHost, Clock, MediaEngine, NetworkMonitor, RemoteCommandCenter, SystemClock,
};
use std::sync::Arc;

/// Host bridges and runtime settings shared by the playback core.
#[derive(Clone)]
pub struct CoreConfig {
    pub media_engine: Arc<dyn MediaEngine>,

    pub network_monitor: Option<Arc<dyn NetworkMonitor>>,

    pub background_task_host: Option<Arc<dyn BackgroundTaskHost>>,

    pub remote_command_center: Option<Arc<dyn RemoteCommandCenter>>,

    pub clock: Arc<dyn Clock>,

    /// Capacity of the observer notification channel.
    pub event_buffer_size: usize,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("media_engine", &"MediaEngine { ... }")
            .field(
                "network_monitor",
                &self
                    .network_monitor
                    .as_ref()
                    .map(|_| "NetworkMonitor { ... }"),
            )
            .field(
                "background_task_host",
                &self
                    .background_task_host
                    .as_ref()
                    .map(|_| "BackgroundTaskHost { ... }"),
            )
            .field(
                "remote_command_center",
                &self
                    .remote_command_center
                    .as_ref()
                    .map(|_| "RemoteCommandCenter { ... }"),
            )
            .field("event_buffer_size", &self.event_buffer_size)
            .field("features", &self.features)
            .finish()
    }
}

/// Feature toggles that require a matching bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureFlags {
    /// React to connectivity changes (pause on loss, resume on recovery).
    pub enable_network_awareness: bool,

    /// Map remote commands onto the player and publish now-playing info.
    pub enable_remote_control: bool,
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Check feature flags against the injected bridges.
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.features.enable_network_awareness && self.network_monitor.is_none() {
            return Err(Error::Config(
                "Network awareness enabled but no NetworkMonitor provided. \
                 Disable the feature or inject a NetworkMonitor implementation."
                    .to_string(),
            ));
        }

        if self.features.enable_remote_control && self.remote_command_center.is_none() {
            return Err(Error::Config(
                "Remote control enabled but no RemoteCommandCenter provided. \
                 Disable the feature or inject a RemoteCommandCenter implementation."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct CoreConfigBuilder {
    media_engine: Option<Arc<dyn MediaEngine>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    background_task_host: Option<Arc<dyn BackgroundTaskHost>>,
    remote_command_center: Option<Arc<dyn RemoteCommandCenter>>,
    clock: Option<Arc<dyn Clock>>,
    event_buffer_size: Option<usize>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn background_task_host(mut self, host: Arc<dyn BackgroundTaskHost>) -> Self {
        self.background_task_host = Some(host);
        self
    }

    pub fn remote_command_center(mut self, center: Arc<dyn RemoteCommandCenter>) -> Self {
        self.remote_command_center = Some(center);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn enable_network_awareness(mut self, enabled: bool) -> Self {
        self.features.enable_network_awareness = enabled;
        self
    }

    pub fn enable_remote_control(mut self, enabled: bool) -> Self {
        self.features.enable_remote_control = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Assemble and validate the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when no media engine was injected
    /// - [`Error::Config`] when a feature flag lacks its bridge
    pub fn build(self) -> Result<CoreConfig> {
        let media_engine = self.media_engine.ok_or_else(|| Error::CapabilityMissing {
            capability: "MediaEngine".to_string(),
            message: "A MediaEngine implementation is required to drive playback. \
                      Inject the platform player wrapper with .media_engine()."
                .to_string(),
        })?;

        let config = CoreConfig {
            media_engine,
            network_monitor: self.network_monitor,
            background_task_host: self.background_task_host,
            remote_command_center: self.remote_command_center,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}
