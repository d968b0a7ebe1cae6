//! Realtime Scenario Tests
//!
//! End-to-end dispatch over in-memory collaborators and fake connections.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use chat_router::application::dto::QueryHistoryRequest;
use chat_router::domain::{Broadcaster, GroupMember, OnlineStatus, TargetType};
use chat_router::presentation::websocket::ConnectionHandle;

use crate::common::{event_type, group_text, private_text, TestApp};

const ALICE: i64 = 1;
const BOB: i64 = 2;
const CAROL: i64 = 3;

#[tokio::test]
async fn test_private_message_to_offline_receiver_is_kept_for_history() {
    let app = TestApp::new();
    app.add_user(ALICE);
    let mut alice = app.connect(ALICE);

    app.send_chat(ALICE, private_text(BOB, "are you there?")).await;

    let frames = alice.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["code"], 200);
    assert_eq!(event_type(&frames[0]), Some("chat_ack"));
    assert_eq!(app.store.len(), 1);

    // Bob connects later: nothing is replayed, history has the message
    let mut bob = app.connect(BOB);
    assert!(bob.drain().is_empty());

    let page = app
        .state
        .history
        .query_history(
            BOB,
            &QueryHistoryRequest {
                target_type: TargetType::Private,
                target_id: ALICE,
                cursor: 0,
                limit: 20,
                start_time: None,
                end_time: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.messages.len(), 1);
    assert_eq!(page.messages[0].id, frames[0]["data"]["data"]["id"].as_i64().unwrap());
    assert!(!page.messages[0].is_read);
}

#[tokio::test]
async fn test_private_message_acked_once_and_pushed_once() {
    let app = TestApp::new();
    let alice_profile = app.add_user(ALICE);
    let mut alice = app.connect(ALICE);
    let mut bob = app.connect(BOB);

    app.send_chat(ALICE, private_text(BOB, "hello")).await;

    let acks = alice.drain();
    assert_eq!(acks.len(), 1);
    assert_eq!(event_type(&acks[0]), Some("chat_ack"));

    let pushes = bob.drain();
    assert_eq!(pushes.len(), 1);
    assert_eq!(event_type(&pushes[0]), Some("chat"));
    assert_eq!(pushes[0]["data"]["send_id"], ALICE);
    assert_eq!(pushes[0]["data"]["data"]["id"], acks[0]["data"]["data"]["id"]);
    assert_eq!(
        pushes[0]["data"]["data"]["sender_nickname"],
        json!(alice_profile.nickname)
    );
}

#[tokio::test]
async fn test_group_message_reaches_online_members_only() {
    let app = TestApp::new();
    const GROUP: i64 = 40;
    const DAVE: i64 = 4;
    const ERIN: i64 = 5;

    app.add_online_member(GROUP, ALICE);
    app.add_online_member(GROUP, BOB);
    app.add_online_member(GROUP, CAROL);
    // Connected but reported offline by the member service
    app.groups.add_member(GroupMember::new(GROUP, ERIN));

    let mut alice = app.connect(ALICE);
    let mut bob = app.connect(BOB);
    let mut carol = app.connect(CAROL);
    let mut dave = app.connect(DAVE);
    let mut erin = app.connect(ERIN);

    app.send_chat(ALICE, group_text(GROUP, "standup in 5")).await;

    let alice_frames = alice.drain();
    assert_eq!(alice_frames.len(), 1);
    assert_eq!(event_type(&alice_frames[0]), Some("chat_ack"));

    for frames in [bob.drain(), carol.drain()] {
        assert_eq!(frames.len(), 1);
        assert_eq!(event_type(&frames[0]), Some("chat"));
        assert_eq!(frames[0]["data"]["data"]["group_id"], GROUP);
    }

    assert!(dave.drain().is_empty());
    assert!(erin.drain().is_empty());
}

#[tokio::test]
async fn test_group_nickname_not_applied_to_push() {
    // Group nicknames only apply to history reads
    let app = TestApp::new();
    app.users
        .insert(chat_router::domain::UserProfile::new(ALICE, "alice"));
    app.groups.add_member(
        GroupMember::new(9, ALICE)
            .with_status(OnlineStatus::Online)
            .with_nickname("al"),
    );
    app.add_online_member(9, BOB);
    let _alice = app.connect(ALICE);
    let mut bob = app.connect(BOB);

    app.send_chat(ALICE, group_text(9, "hi")).await;

    let frames = bob.drain();
    assert_eq!(frames[0]["data"]["data"]["sender_nickname"], "alice");
}

#[tokio::test]
async fn test_malformed_bytes_answered_and_connection_kept() {
    let app = TestApp::new();
    let mut alice = app.connect(ALICE);
    let mut bob = app.connect(BOB);

    app.send_frame(ALICE, b"\xff{not json").await;

    let frames = alice.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["code"], 400);
    assert_eq!(frames[0]["data"], json!(null));
    assert!(app.state.registry.is_online(ALICE));
    assert!(app.store.is_empty());

    // The connection still works
    app.send_chat(ALICE, private_text(BOB, "sorry about that")).await;
    assert_eq!(event_type(&alice.drain()[0]), Some("chat_ack"));
    assert_eq!(bob.drain().len(), 1);
}

#[tokio::test]
async fn test_invalid_chat_is_rejected_before_storage() {
    let app = TestApp::new();
    let mut alice = app.connect(ALICE);
    let mut bob = app.connect(BOB);

    app.send_chat(
        ALICE,
        json!({"target_type": "private", "receiver_id": BOB, "type": "text", "content": []}),
    )
    .await;

    let frames = alice.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0]["code"], 400);
    assert!(app.store.is_empty());
    assert!(bob.drain().is_empty());
}

#[tokio::test]
async fn test_server_only_and_unknown_types_rejected() {
    let app = TestApp::new();
    let mut alice = app.connect(ALICE);

    for frame in [
        json!({"type": "chat_ack", "data": {}}),
        json!({"type": "typing", "data": {}}),
    ] {
        app.send_frame(ALICE, frame.to_string().as_bytes()).await;
    }

    let frames = alice.drain();
    assert_eq!(frames.len(), 2);
    assert!(frames.iter().all(|f| f["code"] == 400));
    assert!(frames[1]["message"].as_str().unwrap().contains("typing"));
}

#[tokio::test]
async fn test_presence_change_reaches_related_users() {
    let app = TestApp::new();
    app.add_online_member(7, ALICE);
    app.add_online_member(7, BOB);
    let mut alice = app.connect(ALICE);
    let mut bob = app.connect(BOB);
    let mut carol = app.connect(CAROL);

    app.send_frame(
        ALICE,
        json!({"type": "presence", "data": {"status": "busy"}})
            .to_string()
            .as_bytes(),
    )
    .await;

    let frames = bob.drain();
    assert_eq!(frames.len(), 1);
    assert_eq!(event_type(&frames[0]), Some("presence"));
    assert_eq!(
        frames[0]["data"]["data"],
        json!({"user_id": ALICE, "status": "busy"})
    );
    assert!(alice.drain().is_empty());
    assert!(carol.drain().is_empty());
}

#[tokio::test]
async fn test_full_outbound_queue_drops_connection() {
    let app = TestApp::new();
    let mut alice = app.connect(ALICE);

    let (handle, _bob_outbound) = ConnectionHandle::channel(1);
    let bob_connection = handle.id();
    app.state.registry.register(BOB, handle);

    app.send_chat(ALICE, private_text(BOB, "one")).await;
    app.send_chat(ALICE, private_text(BOB, "two")).await;

    // Both stored and acknowledged, second push failed
    assert_eq!(app.store.len(), 2);
    assert_eq!(alice.drain().len(), 2);
    assert!(!app.state.registry.is_online(BOB));
    assert!(!app.state.registry.unregister_connection(BOB, bob_connection));
}

#[tokio::test]
async fn test_reconnect_replaces_previous_connection() {
    let app = TestApp::new();
    let mut first = app.connect(ALICE);
    let mut second = app.connect(ALICE);
    let _bob = app.connect(BOB);

    app.send_chat(BOB, private_text(ALICE, "ping")).await;

    assert!(first.drain().is_empty());
    assert_eq!(second.drain().len(), 1);
    assert_eq!(app.state.registry.len(), 2);
}

#[tokio::test]
async fn test_concurrent_senders_all_delivered() {
    let app = Arc::new(TestApp::new());
    let mut bob = app.connect(BOB);
    let senders: Vec<i64> = (10..20).collect();
    let _clients: Vec<_> = senders.iter().map(|id| app.connect(*id)).collect();

    let tasks: Vec<_> = senders
        .iter()
        .map(|id| {
            let app = app.clone();
            let id = *id;
            tokio::spawn(async move { app.send_chat(id, private_text(BOB, "hey")).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(bob.drain().len(), senders.len());
    assert_eq!(app.store.len(), senders.len());
}
