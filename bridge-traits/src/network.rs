//! Network Reachability Abstraction
//!
//! The core never opens sockets itself; it only observes which kind of
//! connection the device currently has so it can pause on loss and resume on
//! recovery.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Connectivity category reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Connection {
    /// No route to the internet.
    None,
    /// WiFi connection
    WiFi,
    /// Cellular/mobile data connection
    Cellular,
    /// Ethernet connection
    Ethernet,
    /// Other or unknown connection type
    Other,
}

impl Connection {
    /// `true` for every category except [`Connection::None`].
    pub fn is_reachable(&self) -> bool {
        !matches!(self, Connection::None)
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: System network APIs (NetworkManager, SystemConfiguration, Windows Network List Manager)
/// - **iOS**: Network framework, Reachability
/// - **Android**: ConnectivityManager
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// async fn wait_for_wifi(monitor: &dyn NetworkMonitor) -> Result<()> {
///     let mut changes = monitor.subscribe_changes().await?;
///     while let Some(connection) = changes.next().await {
///         if connection == Connection::WiFi {
///             break;
///         }
///     }
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Current connectivity category.
    async fn current_connection(&self) -> Connection;

    /// Check if currently connected to any network
    async fn is_reachable(&self) -> bool {
        self.current_connection().await.is_reachable()
    }

    /// Subscribe to connectivity changes.
    ///
    /// Implementations may push the same category repeatedly; consumers are
    /// expected to de-duplicate.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of connectivity updates
#[async_trait::async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next connectivity update
    ///
    /// Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<Connection>;
}
