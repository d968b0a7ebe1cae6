//! Group Member entity and membership trait.
//!
//! Read-only to this service: membership is owned by the group management
//! service and only consulted to resolve fan-out and presence audiences.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::user::OnlineStatus;
use crate::shared::error::AppError;

/// Member role inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    Member,
    Admin,
    Owner,
}

impl MemberRole {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }
}

/// A user's membership in a group.
///
/// Maps to the `group_members` table:
/// - group_id: BIGINT NOT NULL (composite PK)
/// - user_id: BIGINT NOT NULL (composite PK)
/// - nickname: VARCHAR(32) NULL
/// - role: VARCHAR(16) NOT NULL DEFAULT 'member'
/// - online_status: VARCHAR(16) NOT NULL DEFAULT 'offline'
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: i64,
    pub user_id: i64,
    /// Group-specific nickname, overrides the user's own display name
    pub nickname: Option<String>,
    pub role: MemberRole,
    /// Application-level status as reported by the member service
    pub online_status: OnlineStatus,
}

impl GroupMember {
    pub fn new(group_id: i64, user_id: i64) -> Self {
        Self {
            group_id,
            user_id,
            nickname: None,
            role: MemberRole::Member,
            online_status: OnlineStatus::Offline,
        }
    }

    pub fn with_status(mut self, status: OnlineStatus) -> Self {
        self.online_status = status;
        self
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_role(mut self, role: MemberRole) -> Self {
        self.role = role;
        self
    }

    /// Non-empty group nickname, if any.
    pub fn display_nickname(&self) -> Option<&str> {
        self.nickname.as_deref().filter(|n| !n.trim().is_empty())
    }
}

/// Group membership collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GroupMembership: Send + Sync {
    /// Current members of a group, owners and admins first.
    async fn members(&self, group_id: i64) -> Result<Vec<GroupMember>, AppError>;

    /// Co-members of every group `user_id` belongs to. May contain duplicates
    /// and `user_id` itself; callers dedupe.
    async fn related_members(&self, user_id: i64) -> Result<Vec<GroupMember>, AppError>;
}
