//! Reachability changes.

use async_trait::async_trait;
use bridge_traits::{Clock, Connection, NetworkChangeStream, NetworkMonitor};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{EventListener, EventProducer, Lifecycle, ProducerEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkEvent {
    /// Still online, through another kind of connection.
    NetworkChanged,
    /// Back online after a loss.
    ConnectionRetrieved,
    ConnectionLost,
}

struct NetworkState {
    last_connection: Connection,
    connection_loss_date: Option<DateTime<Utc>>,
}

/// Turns [`NetworkMonitor`] connection changes into [`NetworkEvent`]s.
pub struct NetworkEventProducer {
    monitor: Arc<dyn NetworkMonitor>,
    clock: Arc<dyn Clock>,
    listener: EventListener,
    state: Arc<Mutex<NetworkState>>,
    lifecycle: Arc<Lifecycle>,
}

impl NetworkEventProducer {
    /// The producer assumes it is online until the first snapshot, taken on
    /// [`start`](EventProducer::start).
    pub fn new(
        monitor: Arc<dyn NetworkMonitor>,
        clock: Arc<dyn Clock>,
        listener: EventListener,
    ) -> Self {
        Self {
            monitor,
            clock,
            listener,
            state: Arc::new(Mutex::new(NetworkState {
                last_connection: Connection::Other,
                connection_loss_date: None,
            })),
            lifecycle: Arc::new(Lifecycle::default()),
        }
    }

    pub fn last_connection(&self) -> Connection {
        self.state.lock().last_connection
    }

    pub fn is_online(&self) -> bool {
        self.last_connection().is_reachable()
    }

    /// When connectivity was lost, if it currently is.
    pub fn connection_loss_date(&self) -> Option<DateTime<Utc>> {
        self.state.lock().connection_loss_date
    }
}

/// Record `connection` and derive the event it implies, if any.
fn apply_change(
    state: &Mutex<NetworkState>,
    clock: &dyn Clock,
    connection: Connection,
) -> Option<NetworkEvent> {
    let mut state = state.lock();
    let previous = std::mem::replace(&mut state.last_connection, connection);
    if previous == connection {
        return None;
    }

    if connection == Connection::None {
        state.connection_loss_date = Some(clock.now());
        Some(NetworkEvent::ConnectionLost)
    } else if previous == Connection::None {
        state.connection_loss_date = None;
        Some(NetworkEvent::ConnectionRetrieved)
    } else {
        Some(NetworkEvent::NetworkChanged)
    }
}

#[async_trait]
impl EventProducer for NetworkEventProducer {
    async fn start(&self) {
        let Some((generation, token)) = self.lifecycle.begin() else {
            return;
        };

        // Subscribe before the snapshot so no change falls in between.
        let mut changes: Box<dyn NetworkChangeStream> = match self.monitor.subscribe_changes().await
        {
            Ok(changes) => changes,
            Err(e) => {
                warn!(error = %e, "Network change subscription failed");
                self.lifecycle.finish(generation);
                return;
            }
        };

        let connection = self.monitor.current_connection().await;
        {
            let mut state = self.state.lock();
            state.last_connection = connection;
            state.connection_loss_date = if connection == Connection::None {
                Some(self.clock.now())
            } else {
                None
            };
        }
        debug!(?connection, "Network producer started");

        let listener = self.listener.clone();
        let state = Arc::clone(&self.state);
        let clock = Arc::clone(&self.clock);
        let lifecycle = Arc::clone(&self.lifecycle);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    change = changes.next() => {
                        let Some(connection) = change else {
                            info!("Network change stream closed");
                            lifecycle.finish(generation);
                            break;
                        };
                        if let Some(event) = apply_change(&state, clock.as_ref(), connection) {
                            debug!(?connection, ?event, "Network event");
                            listener.on_event(ProducerEvent::Network(event));
                        }
                    }
                }
            }
        });
    }

    fn stop(&self) {
        if self.lifecycle.cancel() {
            debug!("Network producer stopped");
        }
    }

    fn is_producing(&self) -> bool {
        self.lifecycle.is_active()
    }
}

impl Drop for NetworkEventProducer {
    fn drop(&mut self) {
        self.lifecycle.cancel();
    }
}
