//! Message Handlers
//!
//! History reads and read receipts over plain HTTP. Neither needs a live
//! connection.

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Serialize;

use crate::application::dto::{HistoryPage, QueryHistoryRequest};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Read receipt response
#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub message_id: i64,
    /// False when the caller had already read the message
    pub marked: bool,
}

/// Query one page of a private or group conversation
pub async fn query_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<QueryHistoryRequest>,
) -> Result<Json<HistoryPage>, AppError> {
    let page = state.history.query_history(auth.user_id, &body).await?;
    Ok(Json(page))
}

/// Mark a message as read by the caller
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<String>,
) -> Result<Json<MarkReadResponse>, AppError> {
    let message_id: i64 = message_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid message ID".into()))?;

    let marked = state.history.mark_read(message_id, auth.user_id).await?;

    Ok(Json(MarkReadResponse { message_id, marked }))
}
