//! History API Tests

use axum::http::{HeaderName, HeaderValue, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio_test::assert_ok;

use chat_router::application::dto::HistoryPage;
use chat_router::domain::MessageStore;

use crate::common::{private_text, TestApp};

const ALICE: i64 = 1;
const BOB: i64 = 2;

fn user_header(user_id: i64) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from(user_id),
    )
}

async fn seed_conversation(app: &TestApp, count: usize) {
    let _alice = app.connect(ALICE);
    for n in 0..count {
        app.send_chat(ALICE, private_text(BOB, &format!("message {n}")))
            .await;
    }
    assert_eq!(app.store.len(), count);
}

#[tokio::test]
async fn test_query_requires_credentials() {
    let app = TestApp::new();
    let server = app.server();

    let response = server
        .post("/api/v1/messages/query")
        .json(&json!({"target_type": "private", "target_id": BOB}))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_pagination_walks_newest_first_without_overlap() {
    let app = TestApp::new();
    seed_conversation(&app, 5).await;
    let server = app.server();
    let (name, value) = user_header(BOB);

    let mut seen: Vec<i64> = Vec::new();
    let mut cursor = 0;
    let mut pages = Vec::new();
    loop {
        let response = server
            .post("/api/v1/messages/query")
            .add_header(name.clone(), value.clone())
            .json(&json!({
                "target_type": "private",
                "target_id": ALICE,
                "cursor": cursor,
                "limit": 2
            }))
            .await;
        response.assert_status_ok();

        let page: HistoryPage = response.json();
        seen.extend(page.messages.iter().map(|m| m.id));
        pages.push((page.messages.len(), page.has_more));
        if !page.has_more {
            break;
        }
        cursor = page.next_cursor;
    }

    assert_eq!(pages, vec![(2, true), (2, true), (1, false)]);
    assert_eq!(seen.len(), 5);
    assert!(seen.windows(2).all(|w| w[0] > w[1]));
}

#[tokio::test]
async fn test_empty_conversation_has_zero_cursor() {
    let app = TestApp::new();
    let server = app.server();
    let (name, value) = user_header(ALICE);

    let response = server
        .post("/api/v1/messages/query")
        .add_header(name, value)
        .json(&json!({"target_type": "group", "target_id": 77}))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body, json!({"list": [], "cursor": 0, "has_more": false}));
}

#[tokio::test]
async fn test_out_of_range_limit_rejected() {
    let app = TestApp::new();
    let server = app.server();
    let (name, value) = user_header(ALICE);

    let response = server
        .post("/api/v1/messages/query")
        .add_header(name, value)
        .json(&json!({"target_type": "private", "target_id": BOB, "limit": 500}))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_double_mark_read_keeps_single_reader() {
    let app = TestApp::new();
    seed_conversation(&app, 1).await;
    let server = app.server();
    let (name, value) = user_header(BOB);

    let message_id = {
        let response = server
            .post("/api/v1/messages/query")
            .add_header(name.clone(), value.clone())
            .json(&json!({"target_type": "private", "target_id": ALICE}))
            .await;
        response.json::<HistoryPage>().messages[0].id
    };

    let first = server
        .post(&format!("/api/v1/messages/{message_id}/read"))
        .add_header(name.clone(), value.clone())
        .await;
    first.assert_status_ok();
    assert_eq!(first.json::<Value>()["marked"], true);

    let second = server
        .post(&format!("/api/v1/messages/{message_id}/read"))
        .add_header(name, value)
        .await;
    assert_eq!(second.json::<Value>()["marked"], false);

    let stored = assert_ok!(app.store.get_by_id(message_id).await).unwrap();
    assert_eq!(stored.reader_ids.into_iter().collect::<Vec<_>>(), vec![BOB]);
}

#[tokio::test]
async fn test_mark_read_unknown_message() {
    let app = TestApp::new();
    let server = app.server();
    let (name, value) = user_header(ALICE);

    let response = server
        .post("/api/v1/messages/12345/read")
        .add_header(name, value)
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inverted_time_range_names_the_range() {
    let app = TestApp::new();
    let server = app.server();
    let (name, value) = user_header(ALICE);

    let response = server
        .post("/api/v1/messages/query")
        .add_header(name, value)
        .json(&json!({
            "target_type": "private",
            "target_id": BOB,
            "start_time": "2024-06-01T12:00:00Z",
            "end_time": "2024-06-01T11:00:00Z"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(
        body["errors"],
        json!([{"field": "time_range", "message": "start_time must not be after end_time"}])
    );
    assert_eq!(body["message"], "time_range: start_time must not be after end_time");
}
