//! Broker publishing port.

use async_trait::async_trait;

use crate::domain::entities::Message;
use crate::shared::error::AppError;

/// Publishes stored messages to an external broker. The routing core never
/// consumes from the broker nor manages its delivery guarantees.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn publish(&self, message: &Message) -> Result<(), AppError>;
}

/// Publisher used when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl MessagePublisher for NoopPublisher {
    async fn publish(&self, message: &Message) -> Result<(), AppError> {
        tracing::trace!(message_id = message.id, "No broker configured, skipping publish");
        Ok(())
    }
}
