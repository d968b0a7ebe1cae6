//! User Lookup Implementation
//!
//! Read-only PostgreSQL access to display fields in the `users` table.

use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{OnlineStatus, UserLookup, UserProfile};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    nickname: Option<String>,
    avatar: Option<String>,
    online_status: Option<String>,
}

impl UserRow {
    fn into_profile(self) -> UserProfile {
        UserProfile {
            id: self.id,
            nickname: self.nickname,
            avatar: self.avatar,
            online_status: self
                .online_status
                .map(|s| OnlineStatus::from_str(&s))
                .unwrap_or_default(),
        }
    }
}

#[derive(Clone)]
pub struct PgUserLookup {
    pool: PgPool,
}

impl PgUserLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PgUserLookup {
    async fn get_by_id(&self, id: i64) -> Result<Option<UserProfile>, AppError> {
        let start = Instant::now();
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, nickname, avatar, online_status
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        metrics::record_db_query("select", "users", start.elapsed().as_secs_f64());
        Ok(row.map(UserRow::into_profile))
    }

    async fn get_by_id_list(&self, ids: &[i64]) -> Result<HashMap<i64, UserProfile>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let start = Instant::now();
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, nickname, avatar, online_status
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        metrics::record_db_query("select_many", "users", start.elapsed().as_secs_f64());
        Ok(rows
            .into_iter()
            .map(|row| (row.id, row.into_profile()))
            .collect())
    }
}
