//! Group Membership Implementation
//!
//! Read-only PostgreSQL access to the `group_members` table.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{GroupMember, GroupMembership, MemberRole, OnlineStatus};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

/// Database row representation of the group_members table.
#[derive(Debug, sqlx::FromRow)]
struct MemberRow {
    group_id: i64,
    user_id: i64,
    nickname: Option<String>,
    role: String,
    online_status: String,
}

impl MemberRow {
    fn into_member(self) -> GroupMember {
        GroupMember {
            group_id: self.group_id,
            user_id: self.user_id,
            nickname: self.nickname,
            role: MemberRole::from_str(&self.role),
            online_status: OnlineStatus::from_str(&self.online_status),
        }
    }
}

#[derive(Clone)]
pub struct PgGroupMembership {
    pool: PgPool,
}

impl PgGroupMembership {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupMembership for PgGroupMembership {
    async fn members(&self, group_id: i64) -> Result<Vec<GroupMember>, AppError> {
        let start = Instant::now();
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT group_id, user_id, nickname, role, online_status
            FROM group_members
            WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        metrics::record_db_query("select", "group_members", start.elapsed().as_secs_f64());
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }

    /// Memberships of every group `user_id` belongs to, the user's own rows
    /// included.
    async fn related_members(&self, user_id: i64) -> Result<Vec<GroupMember>, AppError> {
        let start = Instant::now();
        let rows = sqlx::query_as::<_, MemberRow>(
            r#"
            SELECT gm.group_id, gm.user_id, gm.nickname, gm.role, gm.online_status
            FROM group_members gm
            WHERE gm.group_id IN (
                SELECT group_id FROM group_members WHERE user_id = $1
            )
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        metrics::record_db_query("select_related", "group_members", start.elapsed().as_secs_f64());
        Ok(rows.into_iter().map(MemberRow::into_member).collect())
    }
}
