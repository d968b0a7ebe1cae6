//! Chat Service
//!
//! Handles an inbound chat submission: validate, persist, acknowledge the
//! sender, then push to recipients. Persistence happens before any push, and
//! the acknowledgement is enqueued before any recipient push.

use std::collections::HashSet;
use std::sync::Arc;

use crate::application::dto::MessageView;
use crate::domain::{
    codes, Broadcaster, EventType, GroupMember, GroupMembership, Message, MessageDraft,
    MessagePublisher, MessageStore, NewMessage, OutboundEvent, ResponseEnvelope, TargetType,
    UserLookup,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Default cap on the total characters of a message body.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 4000;

/// Chat handling errors. Each one is reported to the sender only.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Malformed chat payload: {0}")]
    MalformedPayload(String),

    #[error("{0}")]
    Validation(String),

    #[error("Failed to store message: {0}")]
    Storage(AppError),

    #[error("Failed to resolve group members: {0}")]
    Membership(AppError),

    #[error("Failed to encode message view: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ChatError {
    /// Reply sent to the originating connection. Storage details stay in logs.
    pub fn to_envelope(&self) -> ResponseEnvelope {
        match self {
            ChatError::MalformedPayload(_) => {
                ResponseEnvelope::bad_request("malformed chat payload")
            }
            ChatError::Validation(msg) => ResponseEnvelope::bad_request(msg.clone()),
            ChatError::Storage(_) => {
                ResponseEnvelope::error(codes::INTERNAL_ERROR, "failed to send message")
            }
            ChatError::Membership(_) => ResponseEnvelope::error(
                codes::INTERNAL_ERROR,
                "message stored but group delivery failed",
            ),
            ChatError::Encoding(_) => {
                ResponseEnvelope::error(codes::INTERNAL_ERROR, "internal server error")
            }
        }
    }
}

/// Group members that should receive a live push: connected according to the
/// registry snapshot AND reporting `online` themselves, minus the sender.
pub fn group_recipients(
    members: &[GroupMember],
    online_ids: &HashSet<i64>,
    sender_id: i64,
) -> Vec<i64> {
    let mut seen = HashSet::new();
    members
        .iter()
        .filter(|m| m.user_id != sender_id)
        .filter(|m| online_ids.contains(&m.user_id) && m.online_status.is_online())
        .map(|m| m.user_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

pub struct ChatService {
    store: Arc<dyn MessageStore>,
    users: Arc<dyn UserLookup>,
    groups: Arc<dyn GroupMembership>,
    publisher: Arc<dyn MessagePublisher>,
    broadcaster: Arc<dyn Broadcaster>,
    max_content_length: usize,
}

impl ChatService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        users: Arc<dyn UserLookup>,
        groups: Arc<dyn GroupMembership>,
        publisher: Arc<dyn MessagePublisher>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            store,
            users,
            groups,
            publisher,
            broadcaster,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }

    pub fn with_max_content_length(mut self, max: usize) -> Self {
        self.max_content_length = max;
        self
    }

    /// Handle a chat submission from `sender_id`. Errors are converted into a
    /// reply to the sender; the returned view is `None` in that case.
    pub async fn handle(&self, sender_id: i64, payload: serde_json::Value) -> Option<MessageView> {
        match self.submit(sender_id, payload).await {
            Ok(view) => Some(view),
            Err(err) => {
                match &err {
                    ChatError::Storage(e) | ChatError::Membership(e) => {
                        tracing::error!(sender_id, error = %e, "Chat handling failed");
                    }
                    other => {
                        tracing::debug!(sender_id, error = %other, "Chat submission rejected");
                    }
                }
                self.broadcaster.send_to_one(sender_id, &err.to_envelope());
                None
            }
        }
    }

    /// Validate, persist, acknowledge and fan out one submission.
    pub async fn submit(
        &self,
        sender_id: i64,
        payload: serde_json::Value,
    ) -> Result<MessageView, ChatError> {
        let draft: MessageDraft = serde_json::from_value(payload)
            .map_err(|e| ChatError::MalformedPayload(e.to_string()))?;

        let new_message = NewMessage::validate(sender_id, draft, self.max_content_length)
            .map_err(ChatError::Validation)?;

        let message = self
            .store
            .save(new_message)
            .await
            .map_err(ChatError::Storage)?;
        metrics::record_message_persisted(message.target_type.as_str());

        tracing::debug!(
            message_id = message.id,
            sender_id,
            target_type = %message.target_type,
            "Message stored"
        );

        let view = self.build_view(message.clone()).await;
        let data = serde_json::to_value(&view)?;

        self.broadcaster.send_to_one(
            sender_id,
            &ResponseEnvelope::success(OutboundEvent::new(
                EventType::ChatAck,
                sender_id,
                data.clone(),
            )),
        );

        let push =
            ResponseEnvelope::success(OutboundEvent::new(EventType::Chat, sender_id, data));
        let fan_out = self.fan_out(&message, &push).await;

        if let Err(e) = self.publisher.publish(&message).await {
            tracing::warn!(message_id = message.id, error = %e, "Broker publish failed");
        }

        fan_out.map(|_| view)
    }

    async fn build_view(&self, message: Message) -> MessageView {
        let sender_id = message.sender_id;
        let sender = match self.users.get_by_id(sender_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(sender_id, error = %e, "Sender lookup failed, sending view without display fields");
                None
            }
        };
        MessageView::build(message, sender.as_ref(), sender_id)
    }

    /// Push to recipients. Returns the number of frames enqueued.
    async fn fan_out(&self, message: &Message, push: &ResponseEnvelope) -> Result<usize, ChatError> {
        match message.target_type {
            TargetType::Private => {
                let Some(receiver_id) = message.receiver_id else {
                    return Ok(0);
                };
                if receiver_id == message.sender_id {
                    return Ok(0);
                }
                let delivered = self.broadcaster.send_to_one(receiver_id, push);
                if !delivered {
                    tracing::debug!(
                        message_id = message.id,
                        receiver_id,
                        "Receiver not reachable, message left for history"
                    );
                }
                Ok(delivered as usize)
            }
            TargetType::Group => {
                let Some(group_id) = message.group_id else {
                    return Ok(0);
                };
                let members = self
                    .groups
                    .members(group_id)
                    .await
                    .map_err(ChatError::Membership)?;
                let recipients =
                    group_recipients(&members, &self.broadcaster.online_user_ids(), message.sender_id);

                tracing::debug!(
                    message_id = message.id,
                    group_id,
                    members = members.len(),
                    recipients = recipients.len(),
                    "Group fan-out"
                );
                Ok(self.broadcaster.send_to_many(&recipients, push))
            }
        }
    }
}
