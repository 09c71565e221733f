//! # Event Producers
//!
//! Producers observe one source (engine signals, network reachability, a
//! retry timer, the quality-adjustment timer) and translate what they see
//! into [`ProducerEvent`]s for the player's single dispatcher.
//!
//! ## Lifetime
//!
//! Every producer is owned by the player. It only holds an [`EventListener`],
//! a non-owning handle to the dispatcher channel, so a producer never keeps
//! the player alive. `start()` and `stop()` are idempotent, and dropping a
//! producer stops it.

mod network;
mod player;
mod quality;
mod retry;

pub use network::{NetworkEvent, NetworkEventProducer};
pub use player::{PlayerEvent, PlayerEventProducer};
pub use quality::{QualityAdjustmentEvent, QualityAdjustmentEventProducer};
pub use retry::{RetryEvent, RetryEventProducer};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// An event produced by one of the producers, tagged by its source.
#[derive(Debug, Clone, PartialEq)]
pub enum ProducerEvent {
    /// Engine events carry the run of the player producer that saw them, so
    /// events of a replaced item can be told apart.
    Player { generation: u64, event: PlayerEvent },
    Network(NetworkEvent),
    Retry(RetryEvent),
    Quality(QualityAdjustmentEvent),
}

/// Common lifecycle of all producers.
#[async_trait]
pub trait EventProducer: Send + Sync {
    /// Start producing events. No-op when already producing.
    async fn start(&self);

    /// Stop producing events. No-op when already stopped.
    fn stop(&self);

    fn is_producing(&self) -> bool;
}

/// Non-owning handle producers publish through.
#[derive(Debug, Clone)]
pub struct EventListener {
    sender: WeakUnboundedSender<ProducerEvent>,
}

impl EventListener {
    pub fn new(sender: &UnboundedSender<ProducerEvent>) -> Self {
        Self {
            sender: sender.downgrade(),
        }
    }

    /// Deliver `event`. Dropped silently once the receiving side is gone.
    pub fn on_event(&self, event: ProducerEvent) {
        match self.sender.upgrade() {
            Some(sender) => {
                if sender.send(event).is_err() {
                    trace!("Listener closed, event dropped");
                }
            }
            None => trace!("Listener gone, event dropped"),
        }
    }
}

/// Create the dispatcher channel: the strong sender stays with the owner, the
/// returned listener goes to the producers.
pub fn channel() -> (
    UnboundedSender<ProducerEvent>,
    UnboundedReceiver<ProducerEvent>,
    EventListener,
) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let listener = EventListener::new(&sender);
    (sender, receiver, listener)
}

/// Running/stopped bookkeeping shared by producers and their tasks.
///
/// Each start hands out a fresh generation so a task that ends on its own
/// only clears its own run, never a later restart.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    inner: Mutex<LifecycleState>,
}

#[derive(Debug, Default)]
struct LifecycleState {
    running: Option<(u64, CancellationToken)>,
    generation: u64,
    /// Run whose output is still wanted; cleared by `cancel`, not by `finish`.
    accepted: Option<u64>,
}

impl Lifecycle {
    /// Begin a run. `None` when one is already active.
    pub(crate) fn begin(&self) -> Option<(u64, CancellationToken)> {
        let mut state = self.inner.lock();
        if state.running.is_some() {
            return None;
        }
        state.generation += 1;
        let token = CancellationToken::new();
        state.running = Some((state.generation, token.clone()));
        state.accepted = Some(state.generation);
        Some((state.generation, token))
    }

    /// Cancel the active run, if any. Returns whether one was active.
    pub(crate) fn cancel(&self) -> bool {
        let mut state = self.inner.lock();
        state.accepted = None;
        match state.running.take() {
            Some((_, token)) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Mark run `generation` as finished.
    pub(crate) fn finish(&self, generation: u64) {
        let mut state = self.inner.lock();
        if matches!(state.running, Some((current, _)) if current == generation) {
            state.running = None;
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.inner.lock().running.is_some()
    }

    /// Whether output of run `generation` is still wanted: it is the latest
    /// run and nobody cancelled it.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().accepted == Some(generation)
    }
}
