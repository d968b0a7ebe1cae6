//! WebSocket Endpoint Tests
//!
//! Drive `/ws` over a real local socket: authentication before the upgrade,
//! connection acknowledgement, presence around connect/disconnect and idle
//! teardown.

use std::time::Duration;

use axum_test::{TestServer, TestWebSocket, WsMessage};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::time::timeout;

use chat_router::domain::Broadcaster;

use crate::common::{event_type, private_text, TestApp};

const ALICE: i64 = 1;
const BOB: i64 = 2;
const GROUP: i64 = 7;

async fn open(server: &TestServer, user_id: i64) -> TestWebSocket {
    server
        .get_websocket(&format!("/ws?id={user_id}"))
        .await
        .into_websocket()
        .await
}

async fn next_frame(socket: &mut TestWebSocket) -> Value {
    timeout(Duration::from_secs(2), socket.receive_json::<Value>())
        .await
        .expect("frame within 2s")
}

/// Open a socket and consume its connection acknowledgement
async fn join(server: &TestServer, user_id: i64) -> TestWebSocket {
    let mut socket = open(server, user_id).await;
    let ack = next_frame(&mut socket).await;
    assert_eq!(event_type(&ack), Some("online"));
    assert_eq!(ack["data"]["data"]["user_id"], user_id);
    socket
}

async fn assert_closed(socket: &mut TestWebSocket, within: Duration) {
    let message = timeout(within, socket.receive_message())
        .await
        .expect("close frame in time");
    assert!(matches!(message, WsMessage::Close(_)), "got {message:?}");
}

async fn assert_quiet(socket: &mut TestWebSocket) {
    assert!(timeout(Duration::from_millis(200), socket.receive_message())
        .await
        .is_err());
}

async fn wait_until_offline(app: &TestApp, user_id: i64) {
    for _ in 0..50 {
        if !app.state.registry.is_online(user_id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("user {user_id} still registered");
}

fn presence(frame: &Value) -> &Value {
    assert_eq!(event_type(frame), Some("presence"));
    &frame["data"]["data"]
}

#[tokio::test]
async fn test_upgrade_without_credentials_is_unauthorized() {
    let app = TestApp::new();
    let server = app.socket_server();

    server
        .get_websocket("/ws")
        .expect_failure()
        .await
        .assert_status_unauthorized();
    server
        .get_websocket("/ws?id=-3")
        .expect_failure()
        .await
        .assert_status_unauthorized();
    assert!(app.state.registry.is_empty());
}

#[tokio::test]
async fn test_connect_and_disconnect_reach_group_peers() {
    let app = TestApp::new();
    app.add_online_member(GROUP, ALICE);
    app.add_online_member(GROUP, BOB);
    let server = app.socket_server();

    let mut bob = join(&server, BOB).await;
    let alice = join(&server, ALICE).await;

    let frame = next_frame(&mut bob).await;
    assert_eq!(presence(&frame), &json!({"user_id": ALICE, "status": "online"}));

    alice.close().await;

    let frame = next_frame(&mut bob).await;
    assert_eq!(presence(&frame), &json!({"user_id": ALICE, "status": "offline"}));
    wait_until_offline(&app, ALICE).await;
}

#[tokio::test]
async fn test_reconnect_closes_old_socket_without_offline_notice() {
    let app = TestApp::new();
    app.add_online_member(GROUP, ALICE);
    app.add_online_member(GROUP, BOB);
    let server = app.socket_server();

    let mut bob = join(&server, BOB).await;
    let mut first = join(&server, ALICE).await;
    assert_eq!(presence(&next_frame(&mut bob).await)["status"], "online");

    let _second = join(&server, ALICE).await;
    assert_eq!(presence(&next_frame(&mut bob).await)["status"], "online");

    assert_closed(&mut first, Duration::from_secs(2)).await;
    assert_quiet(&mut bob).await;
    assert!(app.state.registry.is_online(ALICE));
    assert_eq!(app.state.registry.len(), 2);
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let app = TestApp::with_settings(|settings| {
        settings.websocket.heartbeat_timeout_secs = 1;
    });
    let server = app.socket_server();

    let mut alice = join(&server, ALICE).await;

    assert_closed(&mut alice, Duration::from_secs(5)).await;
    wait_until_offline(&app, ALICE).await;
}

#[tokio::test]
async fn test_chat_over_socket_survives_malformed_frame() {
    let app = TestApp::new();
    let server = app.socket_server();

    let mut alice = join(&server, ALICE).await;
    let mut bob = join(&server, BOB).await;

    alice.send_text("{not json").await;
    let reply = next_frame(&mut alice).await;
    assert_eq!(reply["code"], 400);

    alice
        .send_json(&json!({
            "type": "chat",
            "send_id": ALICE,
            "data": private_text(BOB, "still here")
        }))
        .await;

    let ack = next_frame(&mut alice).await;
    assert_eq!(event_type(&ack), Some("chat_ack"));

    let push = next_frame(&mut bob).await;
    assert_eq!(event_type(&push), Some("chat"));
    assert_eq!(push["data"]["send_id"], ALICE);
    assert_eq!(app.store.len(), 1);
}
