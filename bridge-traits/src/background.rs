//! Background Execution Grants
//!
//! Mobile hosts suspend apps shortly after they leave the foreground. While
//! the player is buffering, waiting for the network, or handling an
//! interruption it asks the host for extra execution time through
//! [`BackgroundTaskHost`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a granted background task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackgroundTaskId(Uuid);

impl BackgroundTaskId {
    /// Generate a new identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BackgroundTaskId {
    fn default() -> Self {
        Self::new()
    }
}

/// Host facility granting background execution time.
///
/// - **iOS**: `beginBackgroundTask` / `endBackgroundTask`
/// - **Android**: foreground service or wake lock
/// - **Desktop**: no-op (always granted)
pub trait BackgroundTaskHost: Send + Sync {
    /// Request background time. Returns `None` when the host refuses.
    fn begin_background_task(&self) -> Option<BackgroundTaskId>;

    /// Release a grant obtained from [`begin_background_task`](Self::begin_background_task).
    fn end_background_task(&self, id: BackgroundTaskId);
}
