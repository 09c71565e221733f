//! Interruption counting for automatic quality adjustment.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use super::{EventListener, EventProducer, Lifecycle, ProducerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityAdjustmentEvent {
    /// Too many interruptions: switch to a lower quality.
    GoDown,
    /// A full interval without interruption: try a higher quality.
    GoUp,
}

/// Counts playback interruptions and turns them into quality hints.
///
/// Reaching `interruption_threshold` emits [`QualityAdjustmentEvent::GoDown`]
/// and resets the count and the interval. An interval that elapses with no
/// interruption emits [`QualityAdjustmentEvent::GoUp`].
pub struct QualityAdjustmentEventProducer {
    listener: EventListener,
    interruption_threshold: u32,
    interval: Duration,
    interruption_count: Arc<AtomicU32>,
    reset: Arc<Notify>,
    lifecycle: Arc<Lifecycle>,
}

impl QualityAdjustmentEventProducer {
    pub fn new(listener: EventListener, interruption_threshold: u32, interval: Duration) -> Self {
        Self {
            listener,
            interruption_threshold,
            interval,
            interruption_count: Arc::new(AtomicU32::new(0)),
            reset: Arc::new(Notify::new()),
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }

    pub fn interruption_count(&self) -> u32 {
        self.interruption_count.load(Ordering::SeqCst)
    }

    /// Record one interruption. Ignored while stopped.
    pub fn increment_interruption_count(&self) {
        if !self.is_producing() {
            return;
        }
        let count = self.interruption_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(count, "Interruption counted");
        if count >= self.interruption_threshold {
            self.reset_state();
            self.listener
                .on_event(ProducerEvent::Quality(QualityAdjustmentEvent::GoDown));
        }
    }

    /// Forget counted interruptions and restart the interval.
    pub fn reset_state(&self) {
        self.interruption_count.store(0, Ordering::SeqCst);
        self.reset.notify_one();
    }
}

#[async_trait]
impl EventProducer for QualityAdjustmentEventProducer {
    async fn start(&self) {
        let Some((_, token)) = self.lifecycle.begin() else {
            return;
        };
        self.interruption_count.store(0, Ordering::SeqCst);
        debug!(interval = ?self.interval, "Quality adjustment producer started");

        let listener = self.listener.clone();
        let count = Arc::clone(&self.interruption_count);
        let reset = Arc::clone(&self.reset);
        let interval = self.interval;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = reset.notified() => continue,
                    _ = tokio::time::sleep(interval) => {
                        if count.swap(0, Ordering::SeqCst) == 0 {
                            listener.on_event(ProducerEvent::Quality(QualityAdjustmentEvent::GoUp));
                        }
                    }
                }
            }
        });
    }

    fn stop(&self) {
        if self.lifecycle.cancel() {
            debug!("Quality adjustment producer stopped");
        }
    }

    fn is_producing(&self) -> bool {
        self.lifecycle.is_active()
    }
}

impl Drop for QualityAdjustmentEventProducer {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
