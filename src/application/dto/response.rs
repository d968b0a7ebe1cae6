//! Response DTOs
//!
//! Message views pushed over connections and returned by history reads.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ContentPart, GroupMember, Message, MessageType, OnlineStatus, TargetType, UserProfile,
};

/// A message enriched with sender display fields and per-viewer read state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageView {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: Option<i64>,
    pub group_id: Option<i64>,
    pub reply_id: Option<i64>,
    pub target_type: TargetType,
    pub content: Vec<ContentPart>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub reader_ids: BTreeSet<i64>,
    pub extra_data: Option<serde_json::Value>,
    pub is_read: bool,
    pub sender_nickname: Option<String>,
    pub sender_avatar: Option<String>,
    pub sender_online_status: Option<OnlineStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MessageView {
    /// Build a view of `message` as seen by `viewer_id`.
    pub fn build(message: Message, sender: Option<&UserProfile>, viewer_id: i64) -> Self {
        let is_read = message.is_read_by(viewer_id);
        Self {
            id: message.id,
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            group_id: message.group_id,
            reply_id: message.reply_id,
            target_type: message.target_type,
            content: message.content,
            message_type: message.message_type,
            reader_ids: message.reader_ids,
            extra_data: message.extra_data,
            is_read,
            sender_nickname: sender.and_then(|s| s.nickname.clone()),
            sender_avatar: sender.and_then(|s| s.avatar.clone()),
            sender_online_status: sender.map(|s| s.online_status),
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }

    /// Replace the sender's display name with their group nickname, if set.
    pub fn with_group_nickname(mut self, membership: Option<&GroupMember>) -> Self {
        if let Some(nickname) = membership.and_then(GroupMember::display_nickname) {
            self.sender_nickname = Some(nickname.to_string());
        }
        self
    }
}

/// One page of history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(rename = "list")]
    pub messages: Vec<MessageView>,
    /// Id of the last returned message, 0 for an empty page
    #[serde(rename = "cursor")]
    pub next_cursor: i64,
    pub has_more: bool,
}

impl HistoryPage {
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            next_cursor: 0,
            has_more: false,
        }
    }
}
