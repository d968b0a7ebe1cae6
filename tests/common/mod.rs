//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::TestServer;
use fake::{faker::name::en::FirstName, Fake};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use chat_router::config::Settings;
use chat_router::domain::{GroupMember, OnlineStatus, UserProfile};
use chat_router::infrastructure::memory::{
    InMemoryGroupDirectory, InMemoryMessageStore, InMemoryUserDirectory,
};
use chat_router::presentation::http::routes;
use chat_router::presentation::websocket::ConnectionHandle;
use chat_router::shared::snowflake::SnowflakeGenerator;
use chat_router::startup::{AppState, Collaborators};

/// Test application over in-memory collaborators
pub struct TestApp {
    pub state: AppState,
    pub store: Arc<InMemoryMessageStore>,
    pub users: Arc<InMemoryUserDirectory>,
    pub groups: Arc<InMemoryGroupDirectory>,
}

impl TestApp {
    /// Create a new test application. Plain user ids are trusted so requests
    /// can authenticate with the `X-User-Id` header.
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    /// Same as [`TestApp::new`] with adjusted settings
    pub fn with_settings(configure: impl FnOnce(&mut Settings)) -> Self {
        let mut settings = Settings::defaults().expect("default settings");
        settings.auth.allow_query_id = true;
        configure(&mut settings);

        let store = Arc::new(InMemoryMessageStore::new(Arc::new(
            SnowflakeGenerator::default(),
        )));
        let users = Arc::new(InMemoryUserDirectory::new());
        let groups = Arc::new(InMemoryGroupDirectory::new());

        let collaborators = Collaborators {
            store: store.clone(),
            users: users.clone(),
            groups: groups.clone(),
            publisher: Arc::new(chat_router::domain::NoopPublisher),
        };

        Self {
            state: AppState::new(settings, collaborators),
            store,
            users,
            groups,
        }
    }

    /// HTTP test server over the full router
    pub fn server(&self) -> TestServer {
        TestServer::new(routes::create_router(self.state.clone())).expect("test server")
    }

    /// Test server bound to a local port, needed for WebSocket upgrades
    pub fn socket_server(&self) -> TestServer {
        TestServer::builder()
            .http_transport()
            .build(routes::create_router(self.state.clone()))
            .expect("socket test server")
    }

    /// Add a user profile with a random nickname
    pub fn add_user(&self, id: i64) -> UserProfile {
        let profile = UserProfile::new(id, FirstName().fake::<String>());
        self.users.insert(profile.clone());
        profile
    }

    /// Add an online member to a group
    pub fn add_online_member(&self, group_id: i64, user_id: i64) {
        self.groups
            .add_member(GroupMember::new(group_id, user_id).with_status(OnlineStatus::Online));
    }

    /// Register a fake live connection for `user_id`
    pub fn connect(&self, user_id: i64) -> TestClient {
        let (handle, outbound) = ConnectionHandle::channel(64);
        self.state.registry.register(user_id, handle);
        TestClient { user_id, outbound }
    }

    /// Send a raw frame as `user_id`
    pub async fn send_frame(&self, user_id: i64, bytes: &[u8]) {
        self.state.dispatcher.handle_frame(user_id, bytes).await;
    }

    /// Send a chat envelope as `user_id`
    pub async fn send_chat(&self, user_id: i64, data: Value) {
        let frame = json!({"type": "chat", "send_id": user_id, "data": data});
        self.send_frame(user_id, frame.to_string().as_bytes()).await;
    }
}

/// Receiving side of a fake connection
pub struct TestClient {
    pub user_id: i64,
    outbound: mpsc::Receiver<Arc<str>>,
}

impl TestClient {
    /// Every frame queued so far, decoded
    pub fn drain(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.outbound.try_recv() {
            frames.push(serde_json::from_str(&frame).expect("outbound frame is JSON"));
        }
        frames
    }
}

/// Event type of an outbound frame, `None` for error replies
pub fn event_type(frame: &Value) -> Option<&str> {
    frame["data"]["type"].as_str()
}

pub fn private_text(receiver_id: i64, text: &str) -> Value {
    json!({
        "target_type": "private",
        "receiver_id": receiver_id,
        "type": "text",
        "content": [{"type": "text", "content": text}]
    })
}

pub fn group_text(group_id: i64, text: &str) -> Value {
    json!({
        "target_type": "group",
        "group_id": group_id,
        "type": "text",
        "content": [{"type": "text", "content": text}]
    })
}
