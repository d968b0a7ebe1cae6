use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{GroupMember, GroupMembership, UserLookup, UserProfile};
use crate::shared::error::AppError;

/// Group memberships keyed by group id.
#[derive(Default)]
pub struct InMemoryGroupDirectory {
    groups: RwLock<HashMap<i64, Vec<GroupMember>>>,
}

impl InMemoryGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a membership record.
    pub fn add_member(&self, member: GroupMember) {
        let mut groups = self.groups.write();
        let members = groups.entry(member.group_id).or_default();
        members.retain(|m| m.user_id != member.user_id);
        members.push(member);
    }

    pub fn remove_member(&self, group_id: i64, user_id: i64) {
        if let Some(members) = self.groups.write().get_mut(&group_id) {
            members.retain(|m| m.user_id != user_id);
        }
    }
}

#[async_trait]
impl GroupMembership for InMemoryGroupDirectory {
    async fn members(&self, group_id: i64) -> Result<Vec<GroupMember>, AppError> {
        Ok(self.groups.read().get(&group_id).cloned().unwrap_or_default())
    }

    async fn related_members(&self, user_id: i64) -> Result<Vec<GroupMember>, AppError> {
        Ok(self
            .groups
            .read()
            .values()
            .filter(|members| members.iter().any(|m| m.user_id == user_id))
            .flat_map(|members| members.iter().cloned())
            .collect())
    }
}

/// User profiles keyed by id.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<i64, UserProfile>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile: UserProfile) {
        self.users.write().insert(profile.id, profile);
    }
}

#[async_trait]
impl UserLookup for InMemoryUserDirectory {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserProfile>, AppError> {
        Ok(self.users.read().get(&id).cloned())
    }

    async fn get_by_id_list(&self, ids: &[i64]) -> Result<HashMap<i64, UserProfile>, AppError> {
        let users = self.users.read();
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|profile| (*id, profile.clone())))
            .collect())
    }
}
