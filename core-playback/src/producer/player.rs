//! Engine signals of the current item.

use async_trait::async_trait;
use bridge_traits::{BufferStatus, EngineError, EngineSignal, MediaEngine, MetadataItem};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::{EventListener, EventProducer, Lifecycle, ProducerEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The item stopped, with the error the engine attached if any.
    EndedPlaying(Option<EngineError>),
    InterruptionBegan,
    InterruptionEnded { should_resume: bool },
    LoadedDuration(Duration),
    LoadedMetadata(Vec<MetadataItem>),
    LoadedMoreRange { earliest: Duration, latest: Duration },
    Progressed(Duration),
    ReadyToPlay,
    PlaybackLikelyToKeepUp,
    RouteChanged,
    SessionInvalidated,
    StartedBuffering,
}

/// Subscribes to the engine signal stream and maps signals to
/// [`PlayerEvent`]s.
///
/// Buffer status is forwarded only when it changes; the memory of the last
/// status is reset on every start.
pub struct PlayerEventProducer {
    engine: Arc<dyn MediaEngine>,
    listener: EventListener,
    lifecycle: Arc<Lifecycle>,
}

impl PlayerEventProducer {
    pub fn new(engine: Arc<dyn MediaEngine>, listener: EventListener) -> Self {
        Self {
            engine,
            listener,
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }

    /// Whether events tagged with `generation` belong to the item loaded now.
    pub fn is_current(&self, generation: u64) -> bool {
        self.lifecycle.is_current(generation)
    }
}

fn map_signal(signal: EngineSignal, last_status: &mut Option<BufferStatus>) -> Option<PlayerEvent> {
    let event = match signal {
        EngineSignal::Progressed(time) => PlayerEvent::Progressed(time),
        EngineSignal::DurationLoaded(duration) => PlayerEvent::LoadedDuration(duration),
        EngineSignal::MetadataLoaded(items) => PlayerEvent::LoadedMetadata(items),
        EngineSignal::LoadedRangeExtended(range) => PlayerEvent::LoadedMoreRange {
            earliest: range.earliest,
            latest: range.latest,
        },
        EngineSignal::ReadyToPlay => PlayerEvent::ReadyToPlay,
        EngineSignal::BufferStatusChanged(status) => {
            if *last_status == Some(status) {
                return None;
            }
            *last_status = Some(status);
            match status {
                BufferStatus::Empty => PlayerEvent::StartedBuffering,
                BufferStatus::LikelyToKeepUp => PlayerEvent::PlaybackLikelyToKeepUp,
            }
        }
        EngineSignal::RouteChanged => PlayerEvent::RouteChanged,
        EngineSignal::SessionInvalidated => PlayerEvent::SessionInvalidated,
        EngineSignal::EndedPlaying(error) => PlayerEvent::EndedPlaying(error),
        EngineSignal::InterruptionBegan => PlayerEvent::InterruptionBegan,
        EngineSignal::InterruptionEnded { should_resume } => {
            PlayerEvent::InterruptionEnded { should_resume }
        }
    };
    Some(event)
}

#[async_trait]
impl EventProducer for PlayerEventProducer {
    async fn start(&self) {
        let Some((generation, token)) = self.lifecycle.begin() else {
            return;
        };

        let mut signals = match self.engine.subscribe_signals().await {
            Ok(signals) => signals,
            Err(e) => {
                warn!(error = %e, "Engine signal subscription failed");
                self.lifecycle.finish(generation);
                return;
            }
        };
        debug!("Player event producer started");

        let listener = self.listener.clone();
        let lifecycle = Arc::clone(&self.lifecycle);

        tokio::spawn(async move {
            let mut last_status = None;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    signal = signals.next() => {
                        let Some(signal) = signal else {
                            debug!("Engine signal stream closed");
                            lifecycle.finish(generation);
                            break;
                        };
                        trace!(?signal, "Engine signal");
                        if let Some(event) = map_signal(signal, &mut last_status) {
                            listener.on_event(ProducerEvent::Player { generation, event });
                        }
                    }
                }
            }
        });
    }

    fn stop(&self) {
        if self.lifecycle.cancel() {
            debug!("Player event producer stopped");
        }
    }

    fn is_producing(&self) -> bool {
        self.lifecycle.is_active()
    }
}

impl Drop for PlayerEventProducer {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
