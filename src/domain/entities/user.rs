//! User profile and lookup trait.
//!
//! Only the display fields the routing core needs; accounts themselves are
//! managed elsewhere.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Application-level online status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OnlineStatus {
    #[default]
    Offline,
    Online,
    Busy,
    Away,
}

impl OnlineStatus {
    /// Convert from database string representation.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "online" => Self::Online,
            "busy" => Self::Busy,
            "away" => Self::Away,
            _ => Self::Offline,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Busy => "busy",
            Self::Away => "away",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl std::fmt::Display for OnlineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display fields of a user.
///
/// Read from the `users` table (id, nickname, avatar, online_status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub online_status: OnlineStatus,
}

impl UserProfile {
    pub fn new(id: i64, nickname: impl Into<String>) -> Self {
        Self {
            id,
            nickname: Some(nickname.into()),
            avatar: None,
            online_status: OnlineStatus::Offline,
        }
    }
}

/// User lookup collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserProfile>, AppError>;

    /// Profiles for the given ids; unknown ids are absent from the map.
    async fn get_by_id_list(&self, ids: &[i64]) -> Result<HashMap<i64, UserProfile>, AppError>;
}
