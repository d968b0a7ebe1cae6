//! Delivery outcome reporting.

use uuid::Uuid;

use crate::infrastructure::metrics;

/// Why a frame could not be enqueued for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("outbound queue full")]
    Backpressure,

    #[error("connection closed")]
    Closed,
}

/// Receives per-recipient delivery outcomes from the registry. Called on the
/// sending task, so implementations must not block.
pub trait DeliveryObserver: Send + Sync {
    fn on_delivered(&self, _user_id: i64) {}

    fn on_failed(&self, _user_id: i64, _connection_id: Uuid, _error: DeliveryError) {}

    /// Recipient had no registered connection.
    fn on_unreachable(&self, _user_id: i64) {}
}

/// Logs failures and counts every outcome.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDeliveryObserver;

impl DeliveryObserver for TracingDeliveryObserver {
    fn on_delivered(&self, _user_id: i64) {
        metrics::record_delivery("delivered");
    }

    fn on_failed(&self, user_id: i64, connection_id: Uuid, error: DeliveryError) {
        metrics::record_delivery("failed");
        tracing::warn!(
            user_id,
            connection_id = %connection_id,
            error = %error,
            "Delivery failed, tearing down connection"
        );
    }

    fn on_unreachable(&self, user_id: i64) {
        metrics::record_delivery("unreachable");
        tracing::trace!(user_id, "Recipient not connected");
    }
}
