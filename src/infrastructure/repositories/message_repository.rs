//! Message Store Implementation
//!
//! PostgreSQL implementation of [`MessageStore`] with keyset pagination.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::{
    ContentPart, HistoryFilter, Message, MessageStore, MessageType, MessageUpdate, NewMessage,
    TargetType,
};
use crate::infrastructure::metrics;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

const MESSAGE_COLUMNS: &str = r#"
    id, sender_id, receiver_id, group_id, reply_id, target_type,
    content, message_type, reader_ids, extra_data, created_at, updated_at
"#;

/// PostgreSQL message store.
///
/// Ids are Snowflakes generated here, so id order matches insertion order
/// and doubles as the pagination key.
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
    ids: Arc<SnowflakeGenerator>,
}

impl PgMessageStore {
    pub fn new(pool: PgPool, ids: Arc<SnowflakeGenerator>) -> Self {
        Self { pool, ids }
    }
}

/// Internal row type for message queries.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    sender_id: i64,
    receiver_id: Option<i64>,
    group_id: Option<i64>,
    reply_id: Option<i64>,
    target_type: String,
    content: Json<Vec<ContentPart>>,
    message_type: String,
    reader_ids: Vec<i64>,
    extra_data: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_message(self) -> Result<Message, AppError> {
        let target_type = TargetType::parse(&self.target_type).ok_or_else(|| {
            AppError::Internal(format!(
                "message {} has unknown target_type '{}'",
                self.id, self.target_type
            ))
        })?;
        let message_type = MessageType::parse(&self.message_type).ok_or_else(|| {
            AppError::Internal(format!(
                "message {} has unknown message_type '{}'",
                self.id, self.message_type
            ))
        })?;

        Ok(Message {
            id: self.id,
            sender_id: self.sender_id,
            receiver_id: self.receiver_id,
            group_id: self.group_id,
            reply_id: self.reply_id,
            target_type,
            content: self.content.0,
            message_type,
            reader_ids: self.reader_ids.into_iter().collect(),
            extra_data: self.extra_data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn save(&self, message: NewMessage) -> Result<Message, AppError> {
        let start = Instant::now();
        let id = self.ids.generate();

        let row = sqlx::query_as::<_, MessageRow>(&format!(
            r#"
            INSERT INTO messages
                (id, sender_id, receiver_id, group_id, reply_id, target_type,
                 content, message_type, extra_data)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.group_id)
        .bind(message.reply_id)
        .bind(message.target_type.as_str())
        .bind(Json(&message.content))
        .bind(message.message_type.as_str())
        .bind(message.extra_data)
        .fetch_one(&self.pool)
        .await?;

        metrics::record_db_query("insert", "messages", start.elapsed().as_secs_f64());
        row.into_message()
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        let start = Instant::now();
        let row = sqlx::query_as::<_, MessageRow>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        metrics::record_db_query("select", "messages", start.elapsed().as_secs_f64());
        row.map(MessageRow::into_message).transpose()
    }

    /// Readers are merged into the stored set, never replaced.
    async fn update_fields(&self, id: i64, update: MessageUpdate) -> Result<(), AppError> {
        let start = Instant::now();
        let readers: Option<Vec<i64>> = update.reader_ids.map(|ids| ids.into_iter().collect());

        let result = sqlx::query(
            r#"
            UPDATE messages
            SET reader_ids = CASE
                    WHEN $2::BIGINT[] IS NULL THEN reader_ids
                    ELSE ARRAY(SELECT DISTINCT r FROM unnest(reader_ids || $2::BIGINT[]) AS r ORDER BY r)
                END,
                extra_data = COALESCE($3, extra_data),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(readers)
        .bind(update.extra_data)
        .execute(&self.pool)
        .await?;

        metrics::record_db_query("update", "messages", start.elapsed().as_secs_f64());

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }
        Ok(())
    }

    /// Keyset pagination, newest first. Private scope covers both directions
    /// between the two users.
    async fn query_history(
        &self,
        user_id: i64,
        filter: &HistoryFilter,
    ) -> Result<Vec<Message>, AppError> {
        let start = Instant::now();
        let fetch = filter.fetch as i64;

        let rows = match filter.target_type {
            TargetType::Private => {
                sqlx::query_as::<_, MessageRow>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM messages
                    WHERE target_type = 'private'
                      AND ((sender_id = $1 AND receiver_id = $2)
                        OR (sender_id = $2 AND receiver_id = $1))
                      AND ($3::BIGINT IS NULL OR id < $3)
                      AND ($4::TIMESTAMPTZ IS NULL OR created_at >= $4)
                      AND ($5::TIMESTAMPTZ IS NULL OR created_at <= $5)
                    ORDER BY id DESC
                    LIMIT $6
                    "#
                ))
                .bind(user_id)
                .bind(filter.target_id)
                .bind(filter.before_id)
                .bind(filter.start_time)
                .bind(filter.end_time)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await?
            }
            TargetType::Group => {
                sqlx::query_as::<_, MessageRow>(&format!(
                    r#"
                    SELECT {MESSAGE_COLUMNS}
                    FROM messages
                    WHERE target_type = 'group'
                      AND group_id = $1
                      AND ($2::BIGINT IS NULL OR id < $2)
                      AND ($3::TIMESTAMPTZ IS NULL OR created_at >= $3)
                      AND ($4::TIMESTAMPTZ IS NULL OR created_at <= $4)
                    ORDER BY id DESC
                    LIMIT $5
                    "#
                ))
                .bind(filter.target_id)
                .bind(filter.before_id)
                .bind(filter.start_time)
                .bind(filter.end_time)
                .bind(fetch)
                .fetch_all(&self.pool)
                .await?
            }
        };

        metrics::record_db_query("select_history", "messages", start.elapsed().as_secs_f64());
        rows.into_iter().map(MessageRow::into_message).collect()
    }
}
