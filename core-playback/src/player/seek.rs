//! Seeking and the position queries of the current item.

use bridge_traits::{SeekTolerance, TimeRange};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{AudioPlayer, Inner, PlayerCore, QueuedSeek, SeekCompletion};

impl AudioPlayer {
    /// Seek the current item to `position`.
    ///
    /// The position is clamped into the seekable range when the engine
    /// reports one. Before the engine is ready the seek is kept and executed
    /// once it is; a newer request replaces a kept one, whose completion then
    /// receives `false`.
    pub async fn seek(
        &self,
        position: Duration,
        tolerance: SeekTolerance,
        completion: Option<SeekCompletion>,
    ) {
        let mut core = self.inner.core.lock().await;
        if core.current_item.is_none() {
            drop(core);
            if let Some(completion) = completion {
                completion(false);
            }
            return;
        }
        let position = match self.inner.engine.seekable_range() {
            Some(range) => position.clamp(range.earliest, range.earliest.max(range.latest)),
            None => position,
        };
        self.inner
            .seek_or_queue(&mut core, position, tolerance, completion);
    }

    /// Seek by `offset_secs` (negative goes backward) from the current
    /// position, never before the start.
    pub async fn seek_to_relative_time(&self, offset_secs: f64) {
        let Some(current) = self.current_item_progression().await else {
            return;
        };
        let Ok(target) = Duration::try_from_secs_f64((current.as_secs_f64() + offset_secs).max(0.0))
        else {
            return;
        };
        self.seek(target, SeekTolerance::any(), None).await;
    }

    /// Seek to `padding` after the start of the seekable range.
    pub async fn seek_to_seekable_range_start(
        &self,
        padding: Duration,
        completion: Option<SeekCompletion>,
    ) {
        let Some(range) = self.current_item_seekable_range().await else {
            if let Some(completion) = completion {
                completion(false);
            }
            return;
        };
        let position = (range.earliest + padding).min(range.latest);
        self.seek(position, SeekTolerance::any(), completion).await;
    }

    /// Seek to `padding` before the end of the seekable range.
    pub async fn seek_to_seekable_range_end(
        &self,
        padding: Duration,
        completion: Option<SeekCompletion>,
    ) {
        let Some(range) = self.current_item_seekable_range().await else {
            if let Some(completion) = completion {
                completion(false);
            }
            return;
        };
        let position = range.latest.saturating_sub(padding).max(range.earliest);
        self.seek(position, SeekTolerance::any(), completion).await;
    }

    pub async fn current_item_progression(&self) -> Option<Duration> {
        let core = self.inner.core.lock().await;
        core.current_item.as_ref()?;
        self.inner.engine.current_time()
    }

    pub async fn current_item_duration(&self) -> Option<Duration> {
        let core = self.inner.core.lock().await;
        core.current_item.as_ref()?;
        self.inner.engine.duration()
    }

    pub async fn current_item_loaded_range(&self) -> Option<TimeRange> {
        let core = self.inner.core.lock().await;
        core.current_item.as_ref()?;
        self.inner.engine.loaded_range()
    }

    /// How much is buffered past the current position.
    pub async fn current_item_loaded_ahead(&self) -> Option<Duration> {
        let core = self.inner.core.lock().await;
        core.current_item.as_ref()?;
        self.inner.loaded_ahead()
    }

    /// Seekable range of the current item, or an empty range at the current
    /// position when the engine reports none.
    pub async fn current_item_seekable_range(&self) -> Option<TimeRange> {
        let core = self.inner.core.lock().await;
        core.current_item.as_ref()?;
        self.inner.engine.seekable_range().or_else(|| {
            self.inner
                .engine
                .current_time()
                .map(|current| TimeRange::new(current, current))
        })
    }
}

impl Inner {
    /// Seek now when the engine is ready, otherwise keep the request.
    pub(crate) fn seek_or_queue(
        &self,
        core: &mut PlayerCore,
        position: Duration,
        tolerance: SeekTolerance,
        completion: Option<SeekCompletion>,
    ) {
        let seek = QueuedSeek {
            position,
            tolerance,
            completion,
        };
        if self.engine.is_ready_to_play() {
            self.spawn_seek(seek);
            return;
        }
        debug!(?position, "Engine not ready, seek queued");
        if let Some(replaced) = core.queued_seek.replace(seek) {
            replaced.cancel();
        }
    }

    /// Run the seek off the lock; the completion is called from the task.
    pub(crate) fn spawn_seek(&self, seek: QueuedSeek) {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move {
            let finished = match engine.seek(seek.position, seek.tolerance).await {
                Ok(finished) => finished,
                Err(e) => {
                    warn!(error = %e, "Seek failed");
                    false
                }
            };
            debug!(position = ?seek.position, finished, "Seek settled");
            if let Some(completion) = seek.completion {
                completion(finished);
            }
        });
    }

    pub(crate) fn loaded_ahead(&self) -> Option<Duration> {
        let loaded = self.engine.loaded_range()?;
        let current = self.engine.current_time()?;
        (loaded.earliest <= current).then(|| loaded.latest.saturating_sub(current))
    }
}
