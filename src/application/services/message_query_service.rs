//! Message Query Service
//!
//! Cursor-paginated history reads and read tracking. Works purely against
//! the collaborators, so results are the same whether or not the caller has
//! a live connection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::application::dto::{HistoryPage, MessageView, QueryHistoryRequest};
use crate::domain::{
    GroupMember, GroupMembership, HistoryFilter, MessageStore, MessageUpdate, TargetType,
    UserLookup,
};
use crate::shared::error::{describe_fields, AppError, FieldError};
use crate::shared::validation;

/// Message query errors
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Message not found")]
    NotFound,

    #[error("{}", describe_fields(.0))]
    Invalid(Vec<FieldError>),

    #[error("Storage error: {0}")]
    Storage(#[from] AppError),
}

impl From<QueryError> for AppError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::NotFound => AppError::NotFound("Message not found".into()),
            QueryError::Invalid(errors) => AppError::Validation(errors),
            QueryError::Storage(e) => e,
        }
    }
}

pub struct MessageQueryService {
    store: Arc<dyn MessageStore>,
    users: Arc<dyn UserLookup>,
    groups: Arc<dyn GroupMembership>,
    max_limit: u32,
}

impl MessageQueryService {
    pub fn new(
        store: Arc<dyn MessageStore>,
        users: Arc<dyn UserLookup>,
        groups: Arc<dyn GroupMembership>,
    ) -> Self {
        Self {
            store,
            users,
            groups,
            max_limit: 100,
        }
    }

    /// Clamp page sizes to `max_limit`.
    pub fn with_max_limit(mut self, max_limit: u32) -> Self {
        self.max_limit = max_limit.max(1);
        self
    }

    /// One page of a conversation's history, newest first.
    pub async fn query_history(
        &self,
        user_id: i64,
        request: &QueryHistoryRequest,
    ) -> Result<HistoryPage, QueryError> {
        validation::validate(request).map_err(|e| match e {
            AppError::Validation(errors) => QueryError::Invalid(errors),
            other => QueryError::Storage(other),
        })?;

        let limit = request.limit.min(self.max_limit) as usize;
        let filter = HistoryFilter {
            target_type: request.target_type,
            target_id: request.target_id,
            before_id: (request.cursor > 0).then_some(request.cursor),
            fetch: limit + 1,
            start_time: request.start_time,
            end_time: request.end_time,
        };

        let mut rows = self.store.query_history(user_id, &filter).await?;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        if rows.is_empty() {
            return Ok(HistoryPage::empty());
        }

        let sender_ids: Vec<i64> = {
            let mut seen = HashSet::new();
            rows.iter()
                .map(|m| m.sender_id)
                .filter(|id| seen.insert(*id))
                .collect()
        };

        let profiles = match self.users.get_by_id_list(&sender_ids).await {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!(user_id, error = %e, "Sender lookup failed, returning history without display fields");
                HashMap::new()
            }
        };

        let memberships: HashMap<i64, GroupMember> = if request.target_type == TargetType::Group {
            match self.groups.members(request.target_id).await {
                Ok(members) => members.into_iter().map(|m| (m.user_id, m)).collect(),
                Err(e) => {
                    tracing::warn!(group_id = request.target_id, error = %e, "Member lookup failed, skipping nickname override");
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        let messages: Vec<MessageView> = rows
            .into_iter()
            .map(|message| {
                let sender_id = message.sender_id;
                MessageView::build(message, profiles.get(&sender_id), user_id)
                    .with_group_nickname(memberships.get(&sender_id))
            })
            .collect();

        let next_cursor = messages.last().map(|m| m.id).unwrap_or(0);

        Ok(HistoryPage {
            messages,
            next_cursor,
            has_more,
        })
    }

    /// Record that `user_id` has read `message_id`. Returns false when the
    /// user was already a reader (nothing is written in that case).
    pub async fn mark_read(&self, message_id: i64, user_id: i64) -> Result<bool, QueryError> {
        let mut message = self
            .store
            .get_by_id(message_id)
            .await?
            .ok_or(QueryError::NotFound)?;

        if !message.mark_read(user_id) {
            return Ok(false);
        }

        self.store
            .update_fields(
                message_id,
                MessageUpdate {
                    reader_ids: Some(message.reader_ids),
                    ..Default::default()
                },
            )
            .await?;

        tracing::debug!(message_id, user_id, "Message marked as read");
        Ok(true)
    }
}
