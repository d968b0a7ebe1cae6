//! WebSocket Connection Handler
//!
//! One reader loop per connection plus a writer task draining the outbound
//! queue. Inbound frames are dispatched in arrival order.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
};
use futures::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, Notify};
use tokio::time::interval;

use super::registry::ConnectionHandle;
use super::session::ConnectionState;
use crate::domain::{Broadcaster, EventType, OnlineStatus, OutboundEvent, ResponseEnvelope};
use crate::shared::error::AppError;
use crate::startup::AppState;

const WRITER_DRAIN: Duration = Duration::from_secs(1);

/// Query parameters accepted on connect.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
    /// Trusted user id, honoured only when `auth.allow_query_id` is set
    pub id: Option<i64>,
}

/// WebSocket upgrade handler. The user is resolved before upgrading so that
/// rejected clients get a plain HTTP 401.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> Response {
    let user_id = match state.authenticate(params.token.as_deref(), params.id) {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected connection attempt");
            return AppError::Unauthorized(e.to_string()).into_response();
        }
    };

    let limits = &state.settings.websocket;
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: i64, state: AppState) {
    let (handle, outbound) = ConnectionHandle::channel(state.settings.websocket.outbound_buffer);
    let mut conn = ConnectionState::new(handle.id());
    let close = handle.close_signal();

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_frames(sink, outbound, Arc::clone(&close)));

    if let Some(previous) = state.registry.register(user_id, handle) {
        tracing::info!(
            user_id,
            replaced = %previous.id(),
            "Closing previous connection of reconnecting user"
        );
        previous.close();
    }

    state.registry.send_to_one(
        user_id,
        &ResponseEnvelope::success(OutboundEvent::new(
            EventType::Online,
            user_id,
            json!({
                "user_id": user_id,
                "connection_id": conn.connection_id,
            }),
        )),
    );

    if let Err(e) = state.presence.notify(user_id, OnlineStatus::Online).await {
        tracing::warn!(user_id, error = %e, "Failed to announce user online");
    }

    let idle_timeout = Duration::from_secs(state.settings.websocket.heartbeat_timeout_secs);
    let mut idle_check = interval((idle_timeout / 2).max(Duration::from_secs(1)));
    idle_check.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        conn.record_frame();
                        state.dispatcher.handle_frame(user_id, text.as_str().as_bytes()).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        conn.record_frame();
                        state.dispatcher.handle_frame(user_id, &bytes).await;
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pong replies are sent by axum
                        conn.touch();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(user_id, connection_id = %conn.connection_id, "Connection closed by client");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(user_id, connection_id = %conn.connection_id, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = close.notified() => {
                tracing::debug!(user_id, connection_id = %conn.connection_id, "Close requested");
                break;
            }

            _ = idle_check.tick() => {
                if conn.is_idle(idle_timeout) {
                    tracing::info!(user_id, connection_id = %conn.connection_id, "Idle timeout, closing connection");
                    break;
                }
            }
        }
    }

    // Cleanup. A replaced connection leaves presence to its successor.
    let was_current = state.registry.unregister_connection(user_id, conn.connection_id);

    // With the handle gone the writer flushes and sends a close frame.
    if tokio::time::timeout(WRITER_DRAIN, &mut writer).await.is_err() {
        writer.abort();
    }

    if was_current {
        if let Err(e) = state.presence.notify_disconnected(user_id).await {
            tracing::warn!(user_id, error = %e, "Failed to announce user offline");
        }
    }

    tracing::info!(
        user_id,
        connection_id = %conn.connection_id,
        frames = conn.frames_received,
        "User disconnected"
    );
}

/// Drain the outbound queue into the socket. A failed write asks the reader
/// loop to tear the connection down.
async fn write_frames<S>(mut sink: S, mut outbound: mpsc::Receiver<Arc<str>>, close: Arc<Notify>)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(frame) = outbound.recv().await {
        if let Err(e) = sink.send(Message::Text(frame.to_string().into())).await {
            tracing::debug!(error = %e, "WebSocket write failed");
            close.notify_one();
            return;
        }
    }
    let _ = sink.close().await;
}
