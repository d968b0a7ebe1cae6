//! Presence Service
//!
//! Tells users who share a group with someone that their status changed.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{
    Broadcaster, EventType, GroupMember, GroupMembership, OnlineStatus, OutboundEvent,
    PresenceChange, ResponseEnvelope,
};
use crate::shared::error::AppError;

#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    #[error("Failed to resolve related members: {0}")]
    Membership(#[from] AppError),

    #[error("Failed to encode presence change: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Users related to `user_id` through any shared group, excluding themself.
pub fn related_user_ids(members: &[GroupMember], user_id: i64) -> Vec<i64> {
    let mut seen = HashSet::new();
    members
        .iter()
        .map(|m| m.user_id)
        .filter(|id| *id != user_id && seen.insert(*id))
        .collect()
}

pub struct PresenceService {
    groups: Arc<dyn GroupMembership>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl PresenceService {
    pub fn new(groups: Arc<dyn GroupMembership>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            groups,
            broadcaster,
        }
    }

    /// Push a presence event for `user_id` to every connected related user.
    /// Returns the number of frames enqueued.
    pub async fn notify(&self, user_id: i64, status: OnlineStatus) -> Result<usize, PresenceError> {
        match self.prepare(user_id, status).await? {
            Some((recipients, envelope)) => Ok(self.push(user_id, status, &recipients, &envelope)),
            None => Ok(0),
        }
    }

    /// Announce that the user's last connection went away. Nothing is sent
    /// when a new connection registered while members were being resolved.
    pub async fn notify_disconnected(&self, user_id: i64) -> Result<usize, PresenceError> {
        let status = OnlineStatus::Offline;
        let Some((recipients, envelope)) = self.prepare(user_id, status).await? else {
            return Ok(0);
        };

        if self.broadcaster.is_online(user_id) {
            tracing::debug!(user_id, "User reconnected, offline notice dropped");
            return Ok(0);
        }
        Ok(self.push(user_id, status, &recipients, &envelope))
    }

    async fn prepare(
        &self,
        user_id: i64,
        status: OnlineStatus,
    ) -> Result<Option<(Vec<i64>, ResponseEnvelope)>, PresenceError> {
        let members = self.groups.related_members(user_id).await?;
        let recipients = related_user_ids(&members, user_id);
        if recipients.is_empty() {
            return Ok(None);
        }

        let data = serde_json::to_value(PresenceChange { user_id, status })?;
        let envelope =
            ResponseEnvelope::success(OutboundEvent::new(EventType::Presence, user_id, data));
        Ok(Some((recipients, envelope)))
    }

    fn push(
        &self,
        user_id: i64,
        status: OnlineStatus,
        recipients: &[i64],
        envelope: &ResponseEnvelope,
    ) -> usize {
        let sent = self.broadcaster.send_to_many(recipients, envelope);
        tracing::debug!(
            user_id,
            status = %status,
            related = recipients.len(),
            sent,
            "Presence change pushed"
        );
        sent
    }
}
