//! # Audio Player
//!
//! The playback state machine: owns the queue, the current item, the asset
//! cache and the event producers, and drives the host [`MediaEngine`].
//!
//! ## Overview
//!
//! Every mutation goes through one lock around [`PlayerCore`]. Public
//! control calls take the lock directly; producer events travel over a
//! single channel to a dispatcher task that takes the same lock, so a
//! control call and an event are never applied concurrently.
//!
//! ```text
//! PlayerEventProducer ─┐
//! NetworkEventProducer ┤  mpsc   ┌────────────┐   lock   ┌────────────┐
//! RetryEventProducer ──┼───────▶ │ dispatcher │ ───────▶ │ PlayerCore │
//! QualityAdjustment ───┘         └────────────┘          └────────────┘
//!                                                              ▲
//!                          AudioPlayer::{play, pause, seek, ..}┘
//! ```
//!
//! The dispatcher only holds a weak reference: dropping the last
//! [`AudioPlayer`] handle tears everything down.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{AudioPlayer, PlayableItem, PlayerConfig};
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let core = CoreConfig::builder().media_engine(engine).build()?;
//! let player = AudioPlayer::new(core, PlayerConfig::default()).await?;
//!
//! let mut notifications = player.subscribe();
//! player
//!     .play(vec![Arc::new(PlayableItem::with_url("intro", "https://cdn/intro.mp3"))], 0)
//!     .await?;
//! ```

mod control;
mod seek;
mod state;
mod transitions;

pub use state::SeekCompletion;

pub(crate) use state::{PlayerCore, QueuedSeek};

use bridge_traits::{BackgroundTaskHost, Clock, MediaEngine};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream, PlayerNotification, Receiver};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::AssetCache;
use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result};
use crate::producer::{
    self, EventProducer, NetworkEventProducer, PlayerEventProducer, ProducerEvent,
    QualityAdjustmentEventProducer, RetryEventProducer,
};

pub(crate) struct Inner {
    pub(crate) core: Mutex<PlayerCore>,
    pub(crate) engine: Arc<dyn MediaEngine>,
    pub(crate) cache: Arc<AssetCache>,
    pub(crate) player_events: PlayerEventProducer,
    pub(crate) network_events: Option<NetworkEventProducer>,
    pub(crate) retry_events: RetryEventProducer,
    pub(crate) quality_events: QualityAdjustmentEventProducer,
    pub(crate) background: Option<Arc<dyn BackgroundTaskHost>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) bus: EventBus,
    pub(crate) config: PlayerConfig,
    /// Keeps the dispatcher channel open for as long as the player lives.
    _events: UnboundedSender<ProducerEvent>,
}

/// Handle to the playback state machine.
///
/// Cloning is cheap; all clones drive the same player.
#[derive(Clone)]
pub struct AudioPlayer {
    pub(crate) inner: Arc<Inner>,
}

/// Non-owning handle to an [`AudioPlayer`].
#[derive(Clone)]
pub struct WeakAudioPlayer {
    inner: Weak<Inner>,
}

impl WeakAudioPlayer {
    /// A handle that never upgrades.
    pub fn new() -> Self {
        Self { inner: Weak::new() }
    }

    pub fn upgrade(&self) -> Option<AudioPlayer> {
        self.inner.upgrade().map(|inner| AudioPlayer { inner })
    }
}

impl Default for WeakAudioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayer {
    /// Create a player driving the bridges of `core`.
    ///
    /// Starts the network producer (when a monitor is configured and network
    /// awareness is enabled) and the quality-adjustment producer (when
    /// automatic adjustment is enabled). Must be called within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::Config`] when either configuration is invalid.
    pub async fn new(core: CoreConfig, config: PlayerConfig) -> Result<Self> {
        core.validate()?;
        config.validate().map_err(PlaybackError::Config)?;

        let (sender, receiver, listener) = producer::channel();

        let network_events = core
            .network_monitor
            .clone()
            .filter(|_| core.features.enable_network_awareness)
            .map(|monitor| {
                NetworkEventProducer::new(monitor, Arc::clone(&core.clock), listener.clone())
            });

        let inner = Arc::new(Inner {
            core: Mutex::new(PlayerCore::new(&config)),
            engine: Arc::clone(&core.media_engine),
            cache: Arc::new(AssetCache::new(Arc::clone(&core.media_engine))),
            player_events: PlayerEventProducer::new(
                Arc::clone(&core.media_engine),
                listener.clone(),
            ),
            network_events,
            retry_events: RetryEventProducer::new(
                listener.clone(),
                config.retry_timeout,
                config.maximum_retry_count,
            ),
            quality_events: QualityAdjustmentEventProducer::new(
                listener,
                config.adjust_quality_after_interruption_count,
                config.adjust_quality_time_interval,
            ),
            background: core.background_task_host.clone(),
            clock: Arc::clone(&core.clock),
            bus: EventBus::new(core.event_buffer_size),
            config,
            _events: sender,
        });

        tokio::spawn(dispatch(Arc::downgrade(&inner), receiver));

        if let Some(network) = &inner.network_events {
            network.start().await;
        }
        if inner.config.adjust_quality_automatically {
            inner.quality_events.start().await;
        }

        info!(
            network_aware = inner.network_events.is_some(),
            background = inner.background.is_some(),
            "Audio player created"
        );
        Ok(Self { inner })
    }

    pub fn downgrade(&self) -> WeakAudioPlayer {
        WeakAudioPlayer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    /// Receive observer notifications.
    pub fn subscribe(&self) -> Receiver<PlayerNotification> {
        self.inner.bus.subscribe()
    }

    /// Receive observer notifications through an [`EventStream`].
    pub fn notifications(&self) -> EventStream {
        self.inner.bus.stream()
    }

    /// Stop playback and every producer.
    ///
    /// The handle stays usable: a later `play` starts over, although network
    /// and quality tracking stay off.
    pub async fn shutdown(&self) {
        let mut core = self.inner.core.lock().await;
        self.inner.stop_playback(&mut core).await;
        self.inner.player_events.stop();
        self.inner.quality_events.stop();
        if let Some(network) = &self.inner.network_events {
            network.stop();
        }
        info!("Audio player shut down");
    }
}

impl std::fmt::Debug for AudioPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioPlayer")
            .field("config", &self.inner.config)
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

/// Apply producer events one at a time until the player is gone.
async fn dispatch(player: Weak<Inner>, mut events: UnboundedReceiver<ProducerEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = player.upgrade() else {
            break;
        };
        inner.handle_event(event).await;
    }
    debug!("Event dispatcher finished");
}
