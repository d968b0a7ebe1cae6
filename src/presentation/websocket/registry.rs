//! Connection Registry
//!
//! Maps each online user to their single live connection and delivers
//! outbound frames to them.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Notify};
use uuid::Uuid;

use super::codec;
use super::observer::{DeliveryError, DeliveryObserver, TracingDeliveryObserver};
use crate::domain::{Broadcaster, ResponseEnvelope};
use crate::infrastructure::metrics;

/// Sending side of one live connection. Cheap to clone; clones refer to the
/// same connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: Uuid,
    sender: mpsc::Sender<Arc<str>>,
    close: Arc<Notify>,
}

impl ConnectionHandle {
    /// Create a handle with a bounded outbound queue. The receiver is drained
    /// by the connection's writer task.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (sender, receiver) = mpsc::channel(buffer);
        let handle = Self {
            id: Uuid::new_v4(),
            sender,
            close: Arc::new(Notify::new()),
        };
        (handle, receiver)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Ask the owning connection loop to shut down. The request is kept until
    /// the loop polls for it.
    pub fn close(&self) {
        self.close.notify_one();
    }

    pub fn close_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.close)
    }

    fn try_send(&self, frame: Arc<str>) -> Result<(), DeliveryError> {
        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

pub struct ConnectionRegistry {
    connections: DashMap<i64, ConnectionHandle>,
    observer: Arc<dyn DeliveryObserver>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(Arc::new(TracingDeliveryObserver))
    }
}

impl ConnectionRegistry {
    pub fn new(observer: Arc<dyn DeliveryObserver>) -> Self {
        Self {
            connections: DashMap::new(),
            observer,
        }
    }

    /// Register `handle` as the user's connection. Any previous handle is
    /// returned, not closed.
    pub fn register(&self, user_id: i64, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let connection_id = handle.id;
        let previous = self.connections.insert(user_id, handle);
        metrics::set_websocket_connections(self.connections.len());

        tracing::info!(
            user_id,
            connection_id = %connection_id,
            replaced = previous.is_some(),
            "Connection registered"
        );
        previous
    }

    /// Remove whatever connection the user has. No-op when absent.
    pub fn unregister(&self, user_id: i64) -> Option<ConnectionHandle> {
        let removed = self.connections.remove(&user_id).map(|(_, handle)| handle);
        if removed.is_some() {
            metrics::set_websocket_connections(self.connections.len());
            tracing::info!(user_id, "Connection unregistered");
        }
        removed
    }

    /// Remove the user's entry only if it is still `connection_id`. Returns
    /// whether an entry was removed.
    pub fn unregister_connection(&self, user_id: i64, connection_id: Uuid) -> bool {
        let removed = self
            .connections
            .remove_if(&user_id, |_, handle| handle.id == connection_id)
            .is_some();
        if removed {
            metrics::set_websocket_connections(self.connections.len());
            tracing::info!(user_id, connection_id = %connection_id, "Connection unregistered");
        }
        removed
    }

    pub fn lookup(&self, user_id: i64) -> Option<ConnectionHandle> {
        self.connections.get(&user_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    fn encode_frame(envelope: &ResponseEnvelope) -> Option<Arc<str>> {
        match codec::encode(envelope) {
            Ok(text) => Some(Arc::from(text)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode outbound envelope");
                None
            }
        }
    }

    fn deliver(&self, user_id: i64, frame: &Arc<str>) -> bool {
        // Cloned out so no map guard is held during teardown.
        let Some(handle) = self.lookup(user_id) else {
            self.observer.on_unreachable(user_id);
            return false;
        };

        match handle.try_send(Arc::clone(frame)) {
            Ok(()) => {
                self.observer.on_delivered(user_id);
                true
            }
            Err(error) => {
                self.observer.on_failed(user_id, handle.id, error);
                handle.close();
                self.unregister_connection(user_id, handle.id);
                false
            }
        }
    }
}

impl Broadcaster for ConnectionRegistry {
    fn send_to_one(&self, user_id: i64, envelope: &ResponseEnvelope) -> bool {
        Self::encode_frame(envelope).is_some_and(|frame| self.deliver(user_id, &frame))
    }

    fn send_to_many(&self, user_ids: &[i64], envelope: &ResponseEnvelope) -> usize {
        let Some(frame) = Self::encode_frame(envelope) else {
            return 0;
        };
        user_ids
            .iter()
            .filter(|user_id| self.deliver(**user_id, &frame))
            .count()
    }

    fn send_to_all(&self, envelope: &ResponseEnvelope) -> usize {
        let user_ids: Vec<i64> = self.connections.iter().map(|entry| *entry.key()).collect();
        self.send_to_many(&user_ids, envelope)
    }

    fn online_user_ids(&self) -> HashSet<i64> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    fn is_online(&self, user_id: i64) -> bool {
        self.connections.contains_key(&user_id)
    }
}
