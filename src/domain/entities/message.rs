//! Message entity and store trait.
//!
//! Maps to the `messages` table in the database schema.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Conversation kind a message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// One-to-one conversation, `receiver_id` is set
    Private,
    /// Group conversation, `group_id` is set
    Group,
}

impl TargetType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "private" => Some(Self::Private),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Group => "group",
        }
    }
}

impl std::fmt::Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message kinds accepted by the chat handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    Emoji,
    Link,
}

impl MessageType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "emoji" => Some(Self::Emoji),
            "link" => Some(Self::Link),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Emoji => "emoji",
            Self::Link => "link",
        }
    }
}

/// Kind of a single content part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Text,
    Emoji,
    Image,
    Link,
}

impl ContentType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "emoji" => Some(Self::Emoji),
            "image" => Some(Self::Image),
            "link" => Some(Self::Link),
            _ => None,
        }
    }
}

/// One ordered fragment of a message body (text, emoji, image url, link).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub content: String,
}

/// A persisted chat message.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID, creation ordered)
/// - sender_id: BIGINT NOT NULL
/// - receiver_id: BIGINT NULL (private messages)
/// - group_id: BIGINT NULL (group messages)
/// - reply_id: BIGINT NULL
/// - target_type: TEXT NOT NULL ('private' | 'group')
/// - content: JSONB NOT NULL (array of parts)
/// - message_type: TEXT NOT NULL
/// - reader_ids: BIGINT[] NOT NULL DEFAULT '{}'
/// - extra_data: JSONB NULL
/// - created_at / updated_at: TIMESTAMPTZ NOT NULL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub reply_id: Option<i64>,
    pub target_type: TargetType,
    pub content: Vec<ContentPart>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Users who have read the message. Grows only.
    pub reader_ids: BTreeSet<i64>,
    pub extra_data: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Build a stored message from a validated submission.
    pub fn from_new(id: i64, new: NewMessage, now: DateTime<Utc>) -> Self {
        Self {
            id,
            sender_id: new.sender_id,
            receiver_id: new.receiver_id,
            group_id: new.group_id,
            reply_id: new.reply_id,
            target_type: new.target_type,
            content: new.content,
            message_type: new.message_type,
            reader_ids: BTreeSet::new(),
            extra_data: new.extra_data,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_read_by(&self, user_id: i64) -> bool {
        self.reader_ids.contains(&user_id)
    }

    /// Record `user_id` as a reader. Returns false if it was already present.
    pub fn mark_read(&mut self, user_id: i64) -> bool {
        self.reader_ids.insert(user_id)
    }

    /// Whether `user_id` is a party of this private conversation.
    pub fn involves(&self, user_id: i64) -> bool {
        self.sender_id == user_id || self.receiver_id == Some(user_id)
    }
}

/// Loosely-typed chat payload as sent by clients. Every field is optional so
/// that shape problems surface as validation errors, not decode errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDraft {
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub reply_id: Option<i64>,
    pub target_type: Option<String>,
    pub content: Option<Vec<DraftPart>>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub extra_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftPart {
    #[serde(rename = "type")]
    pub content_type: String,
    pub content: String,
}

/// A submission that satisfies every message invariant, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub reply_id: Option<i64>,
    pub target_type: TargetType,
    pub content: Vec<ContentPart>,
    pub message_type: MessageType,
    pub extra_data: Option<serde_json::Value>,
}

impl NewMessage {
    /// Validate a draft. The error string names the violated invariant.
    pub fn validate(
        sender_id: i64,
        draft: MessageDraft,
        max_content_length: usize,
    ) -> Result<Self, String> {
        if sender_id <= 0 {
            return Err("sender id is required".into());
        }

        let target_type = match draft.target_type.as_deref() {
            None => return Err("target_type is required".into()),
            Some(raw) => TargetType::parse(raw)
                .ok_or_else(|| format!("unknown target_type '{raw}'"))?,
        };

        match target_type {
            TargetType::Private => {
                if draft.receiver_id.is_none() {
                    return Err("private message requires receiver_id".into());
                }
                if draft.group_id.is_some() {
                    return Err("private message must not carry group_id".into());
                }
            }
            TargetType::Group => {
                if draft.group_id.is_none() {
                    return Err("group message requires group_id".into());
                }
                if draft.receiver_id.is_some() {
                    return Err("group message must not carry receiver_id".into());
                }
            }
        }

        let message_type = match draft.message_type.as_deref() {
            None => return Err("message type is required".into()),
            Some(raw) => MessageType::parse(raw)
                .ok_or_else(|| format!("unknown message type '{raw}'"))?,
        };

        let parts = draft.content.unwrap_or_default();
        if parts.is_empty() {
            return Err("message content must not be empty".into());
        }

        let mut content = Vec::with_capacity(parts.len());
        let mut total = 0usize;
        for (index, part) in parts.into_iter().enumerate() {
            let content_type = ContentType::parse(&part.content_type).ok_or_else(|| {
                format!("content part {index} has unknown type '{}'", part.content_type)
            })?;
            if part.content.trim().is_empty() {
                return Err(format!("content part {index} is empty"));
            }
            total += part.content.chars().count();
            content.push(ContentPart {
                content_type,
                content: part.content,
            });
        }
        if total > max_content_length {
            return Err(format!(
                "message content exceeds {max_content_length} characters"
            ));
        }

        Ok(Self {
            sender_id,
            receiver_id: draft.receiver_id,
            group_id: draft.group_id,
            reply_id: draft.reply_id,
            target_type,
            content,
            message_type,
            extra_data: draft.extra_data,
        })
    }
}

/// Scope and window of a history read.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryFilter {
    pub target_type: TargetType,
    pub target_id: i64,
    /// Exclusive upper bound on message id; `None` starts from the newest.
    pub before_id: Option<i64>,
    /// Number of rows to fetch.
    pub fetch: usize,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    /// Whether `message` falls inside this filter for `user_id`.
    pub fn matches(&self, user_id: i64, message: &Message) -> bool {
        let in_scope = match self.target_type {
            TargetType::Private => {
                message.target_type == TargetType::Private
                    && ((message.sender_id == user_id
                        && message.receiver_id == Some(self.target_id))
                        || (message.sender_id == self.target_id
                            && message.receiver_id == Some(user_id)))
            }
            TargetType::Group => {
                message.target_type == TargetType::Group
                    && message.group_id == Some(self.target_id)
            }
        };

        in_scope
            && self.before_id.map_or(true, |before| message.id < before)
            && self.start_time.map_or(true, |start| message.created_at >= start)
            && self.end_time.map_or(true, |end| message.created_at <= end)
    }
}

/// Partial update applied by [`MessageStore::update_fields`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageUpdate {
    /// Readers to add. Stores merge, never replace.
    pub reader_ids: Option<BTreeSet<i64>>,
    pub extra_data: Option<serde_json::Value>,
}

/// Storage collaborator for chat messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message atomically and return it with its assigned id.
    async fn save(&self, message: NewMessage) -> Result<Message, AppError>;

    /// Find a message by id.
    async fn get_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Apply a partial update.
    async fn update_fields(&self, id: i64, update: MessageUpdate) -> Result<(), AppError>;

    /// Messages visible to `user_id` under `filter`, newest first, at most `filter.fetch` rows.
    async fn query_history(
        &self,
        user_id: i64,
        filter: &HistoryFilter,
    ) -> Result<Vec<Message>, AppError>;
}
