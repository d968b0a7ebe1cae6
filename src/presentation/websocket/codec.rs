//! Envelope Codec
//!
//! Wire formats for live connections.

use serde::Deserialize;

use crate::domain::{EventType, ResponseEnvelope};

/// Inbound frame as sent by clients. `event_type` is kept raw so that unknown
/// values still decode and can be answered by the dispatcher.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub send_id: i64,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl InboundEnvelope {
    pub fn kind(&self) -> Option<EventType> {
        EventType::parse(&self.event_type)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Malformed envelope: {0}")]
    Malformed(String),

    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

impl EnvelopeError {
    pub fn to_envelope(&self) -> ResponseEnvelope {
        match self {
            EnvelopeError::Malformed(_) => ResponseEnvelope::bad_request("malformed envelope"),
            EnvelopeError::UnknownEventType(ty) => {
                ResponseEnvelope::bad_request(format!("unknown event type '{ty}'"))
            }
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<InboundEnvelope, EnvelopeError> {
    serde_json::from_slice(bytes).map_err(|e| EnvelopeError::Malformed(e.to_string()))
}

pub fn encode(response: &ResponseEnvelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(response)
}
