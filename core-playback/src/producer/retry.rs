//! Periodic retry ticks while playback is stalled.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::{EventListener, EventProducer, Lifecycle, ProducerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryEvent {
    /// Time to try loading the current item again.
    RetryAvailable,
    /// The retry budget is spent. The producer has stopped itself.
    MaximumRetryCountReached,
}

/// Emits [`RetryEvent::RetryAvailable`] every `retry_timeout` until
/// `maximum_retry_count` ticks went by.
pub struct RetryEventProducer {
    listener: EventListener,
    retry_timeout: Duration,
    maximum_retry_count: u32,
    lifecycle: Arc<Lifecycle>,
}

impl RetryEventProducer {
    pub fn new(listener: EventListener, retry_timeout: Duration, maximum_retry_count: u32) -> Self {
        Self {
            listener,
            retry_timeout,
            maximum_retry_count,
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }
}

#[async_trait]
impl EventProducer for RetryEventProducer {
    async fn start(&self) {
        let Some((generation, token)) = self.lifecycle.begin() else {
            return;
        };
        debug!(timeout = ?self.retry_timeout, "Retry producer started");

        let listener = self.listener.clone();
        let lifecycle = Arc::clone(&self.lifecycle);
        let timeout = self.retry_timeout;
        let maximum = self.maximum_retry_count;

        tokio::spawn(async move {
            // Count restarts with every run.
            let mut retry_count = 0u32;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(timeout) => {
                        retry_count += 1;
                        if retry_count >= maximum {
                            info!(retry_count, "Maximum retry count reached");
                            lifecycle.finish(generation);
                            listener.on_event(ProducerEvent::Retry(RetryEvent::MaximumRetryCountReached));
                            break;
                        }
                        debug!(retry_count, "Retry available");
                        listener.on_event(ProducerEvent::Retry(RetryEvent::RetryAvailable));
                    }
                }
            }
        });
    }

    fn stop(&self) {
        if self.lifecycle.cancel() {
            debug!("Retry producer stopped");
        }
    }

    fn is_producing(&self) -> bool {
        self.lifecycle.is_active()
    }
}

impl Drop for RetryEventProducer {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
