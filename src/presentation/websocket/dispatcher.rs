//! Envelope Dispatcher
//!
//! Routes decoded inbound envelopes to their handlers. Every handler error is
//! answered on the originating connection, which stays open.

use std::sync::Arc;

use super::codec::{self, EnvelopeError, InboundEnvelope};
use crate::application::services::{ChatService, PresenceService};
use crate::domain::{codes, Broadcaster, EventType, OnlineStatus, ResponseEnvelope};
use crate::infrastructure::metrics;

pub struct Dispatcher {
    chat: Arc<ChatService>,
    presence: Arc<PresenceService>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Dispatcher {
    pub fn new(
        chat: Arc<ChatService>,
        presence: Arc<PresenceService>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            chat,
            presence,
            broadcaster,
        }
    }

    /// Decode and dispatch one inbound frame from `user_id`.
    pub async fn handle_frame(&self, user_id: i64, bytes: &[u8]) {
        match codec::decode(bytes) {
            Ok(envelope) => self.dispatch(user_id, envelope).await,
            Err(err) => {
                metrics::record_envelope("malformed");
                tracing::debug!(user_id, error = %err, "Dropping malformed envelope");
                self.reply(user_id, err.to_envelope());
            }
        }
    }

    pub async fn dispatch(&self, user_id: i64, envelope: InboundEnvelope) {
        let kind = envelope.kind();
        metrics::record_envelope(kind.map_or("unknown", |k| k.as_str()));

        if envelope.send_id != 0 && envelope.send_id != user_id {
            tracing::warn!(
                user_id,
                claimed = envelope.send_id,
                "send_id does not match connection user, using connection user"
            );
        }

        match kind {
            Some(EventType::Chat) => {
                self.chat.handle(user_id, envelope.data).await;
            }
            Some(EventType::Online) => self.change_status(user_id, OnlineStatus::Online).await,
            Some(EventType::Offline) => self.change_status(user_id, OnlineStatus::Offline).await,
            Some(EventType::Presence) => match requested_status(&envelope.data) {
                Some(status) => self.change_status(user_id, status).await,
                None => self.reply(
                    user_id,
                    ResponseEnvelope::bad_request("presence requires a valid status"),
                ),
            },
            Some(other @ (EventType::ChatAck | EventType::Recall | EventType::IdRequest)) => {
                self.reply(
                    user_id,
                    ResponseEnvelope::bad_request(format!(
                        "event type '{other}' is not accepted from clients"
                    )),
                );
            }
            None => {
                tracing::debug!(user_id, event_type = %envelope.event_type, "Unknown event type");
                self.reply(
                    user_id,
                    EnvelopeError::UnknownEventType(envelope.event_type).to_envelope(),
                );
            }
        }
    }

    async fn change_status(&self, user_id: i64, status: OnlineStatus) {
        if let Err(e) = self.presence.notify(user_id, status).await {
            tracing::error!(user_id, status = %status, error = %e, "Presence notification failed");
            self.reply(
                user_id,
                ResponseEnvelope::error(codes::INTERNAL_ERROR, "failed to update presence"),
            );
        }
    }

    fn reply(&self, user_id: i64, envelope: ResponseEnvelope) {
        self.broadcaster.send_to_one(user_id, &envelope);
    }
}

/// Status carried by a `presence` envelope: either the bare status string or
/// `{"status": "..."}`.
fn requested_status(data: &serde_json::Value) -> Option<OnlineStatus> {
    let raw = match data {
        serde_json::Value::Object(map) => map.get("status")?,
        other => other,
    };
    serde_json::from_value(raw.clone()).ok()
}
