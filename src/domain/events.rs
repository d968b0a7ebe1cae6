//! Realtime Events
//!
//! Event types exchanged over live connections and the response wrapper every
//! outbound frame is carried in:
//!
//! ```text
//! inbound:  {"type": "chat", "send_id": 1, "data": {...}}
//! outbound: {"code": 200, "message": "success",
//!            "data": {"type": "chat_ack", "send_id": 1, "data": {...}, "time": "..."}}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::OnlineStatus;

/// Known event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Chat message (client submission, or push to recipients)
    Chat,
    /// Sender-side acknowledgement of a stored message
    ChatAck,
    /// Presence change of a related user
    Presence,
    /// Going online (client) / connection established (server)
    Online,
    /// Going offline
    Offline,
    /// Message recall
    Recall,
    /// Real id request for client-generated temporary ids
    IdRequest,
}

impl EventType {
    /// Parse a wire value. Unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(Self::Chat),
            "chat_ack" => Some(Self::ChatAck),
            "presence" => Some(Self::Presence),
            "online" => Some(Self::Online),
            "offline" => Some(Self::Offline),
            "recall" => Some(Self::Recall),
            "id_request" => Some(Self::IdRequest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::ChatAck => "chat_ack",
            Self::Presence => "presence",
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Recall => "recall",
            Self::IdRequest => "id_request",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed event payload inside a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub send_id: i64,
    pub data: serde_json::Value,
    pub time: DateTime<Utc>,
}

impl OutboundEvent {
    pub fn new(event_type: EventType, send_id: i64, data: serde_json::Value) -> Self {
        Self {
            event_type,
            send_id,
            data,
            time: Utc::now(),
        }
    }
}

/// Response status codes carried in `code`.
pub mod codes {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const NOT_FOUND: u16 = 404;
    pub const INTERNAL_ERROR: u16 = 500;
}

/// Generic response wrapper around an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub code: u16,
    pub message: String,
    pub data: Option<OutboundEvent>,
}

impl ResponseEnvelope {
    pub fn success(event: OutboundEvent) -> Self {
        Self {
            code: codes::OK,
            message: "success".into(),
            data: Some(event),
        }
    }

    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::error(codes::BAD_REQUEST, message)
    }

    pub fn is_success(&self) -> bool {
        self.code == codes::OK
    }

    pub fn event_type(&self) -> Option<EventType> {
        self.data.as_ref().map(|event| event.event_type)
    }
}

/// Payload of a `presence` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceChange {
    pub user_id: i64,
    pub status: OnlineStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_type_wire_names() {
        for ty in [
            EventType::Chat,
            EventType::ChatAck,
            EventType::Presence,
            EventType::Online,
            EventType::Offline,
            EventType::Recall,
            EventType::IdRequest,
        ] {
            assert_eq!(EventType::parse(ty.as_str()), Some(ty));
            assert_eq!(serde_json::to_value(ty).unwrap(), json!(ty.as_str()));
        }
        assert_eq!(EventType::parse("typing"), None);
    }

    #[test]
    fn test_error_envelope_has_null_data() {
        let value = serde_json::to_value(ResponseEnvelope::bad_request("nope")).unwrap();
        assert_eq!(value, json!({"code": 400, "message": "nope", "data": null}));
    }
}
