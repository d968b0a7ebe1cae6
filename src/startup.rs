//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{
    ChatService, JwtTokenValidator, MessageQueryService, PresenceService,
};
use crate::config::{Settings, StorageBackend};
use crate::domain::{
    AuthError, Broadcaster, GroupMembership, MessagePublisher, MessageStore, NoopPublisher,
    TokenValidator, UserLookup,
};
use crate::infrastructure::broker::{self, RedisPublisher};
use crate::infrastructure::database;
use crate::infrastructure::memory::{
    InMemoryGroupDirectory, InMemoryMessageStore, InMemoryUserDirectory,
};
use crate::infrastructure::repositories::{PgGroupMembership, PgMessageStore, PgUserLookup};
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::presentation::websocket::{ConnectionRegistry, Dispatcher};
use crate::shared::snowflake::SnowflakeGenerator;

/// The external collaborators the routing core is built on.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn MessageStore>,
    pub users: Arc<dyn UserLookup>,
    pub groups: Arc<dyn GroupMembership>,
    pub publisher: Arc<dyn MessagePublisher>,
}

impl Collaborators {
    /// Process-local collaborators with no broker.
    pub fn in_memory(ids: Arc<SnowflakeGenerator>) -> Self {
        Self {
            store: Arc::new(InMemoryMessageStore::new(ids)),
            users: Arc::new(InMemoryUserDirectory::new()),
            groups: Arc::new(InMemoryGroupDirectory::new()),
            publisher: Arc::new(NoopPublisher),
        }
    }

    /// PostgreSQL-backed collaborators with no broker.
    pub fn postgres(pool: PgPool, ids: Arc<SnowflakeGenerator>) -> Self {
        Self {
            store: Arc::new(PgMessageStore::new(pool.clone(), ids)),
            users: Arc::new(PgUserLookup::new(pool.clone())),
            groups: Arc::new(PgGroupMembership::new(pool)),
            publisher: Arc::new(NoopPublisher),
        }
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn MessagePublisher>) -> Self {
        self.publisher = publisher;
        self
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub presence: Arc<PresenceService>,
    pub history: Arc<MessageQueryService>,
    pub tokens: Option<Arc<dyn TokenValidator>>,
    pub db: Option<PgPool>,
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the routing core over `collaborators` with a fresh registry.
    pub fn new(settings: Settings, collaborators: Collaborators) -> Self {
        Self::with_registry(settings, collaborators, Arc::new(ConnectionRegistry::default()))
    }

    pub fn with_registry(
        settings: Settings,
        collaborators: Collaborators,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        let broadcaster: Arc<dyn Broadcaster> = registry.clone();

        let chat = Arc::new(
            ChatService::new(
                collaborators.store.clone(),
                collaborators.users.clone(),
                collaborators.groups.clone(),
                collaborators.publisher,
                broadcaster.clone(),
            )
            .with_max_content_length(settings.chat.max_content_length),
        );
        let presence = Arc::new(PresenceService::new(
            collaborators.groups.clone(),
            broadcaster.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(chat, presence.clone(), broadcaster));
        let history = Arc::new(
            MessageQueryService::new(
                collaborators.store,
                collaborators.users,
                collaborators.groups,
            )
            .with_max_limit(settings.chat.max_history_limit),
        );

        let tokens = settings
            .auth
            .jwt_secret
            .as_deref()
            .map(|secret| Arc::new(JwtTokenValidator::new(secret)) as Arc<dyn TokenValidator>);

        Self {
            registry,
            dispatcher,
            presence,
            history,
            tokens,
            db: None,
            redis: None,
            settings: Arc::new(settings),
        }
    }

    pub fn with_tokens(mut self, tokens: Arc<dyn TokenValidator>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Resolve the calling user. A bearer token always wins; a bare id is
    /// trusted only when the deployment allows it.
    pub fn authenticate(
        &self,
        token: Option<&str>,
        trusted_id: Option<i64>,
    ) -> Result<i64, AuthError> {
        if let Some(token) = token {
            return match &self.tokens {
                Some(validator) => validator.validate(token),
                None => Err(AuthError::InvalidToken(
                    "token authentication is not configured".into(),
                )),
            };
        }

        match trusted_id {
            Some(id) if self.settings.auth.allow_query_id => {
                if id > 0 {
                    Ok(id)
                } else {
                    Err(AuthError::InvalidUserId(id.to_string()))
                }
            }
            _ => Err(AuthError::MissingCredentials),
        }
    }
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let ids = Arc::new(SnowflakeGenerator::new(
            settings.snowflake.machine_id,
            settings.snowflake.epoch,
        ));

        let (collaborators, db) = match settings.storage.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage, messages will not survive a restart");
                (Collaborators::in_memory(ids), None)
            }
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database).await?;
                tracing::info!("Database connection pool created");
                if settings.database.run_migrations {
                    database::run_migrations(&pool).await?;
                    tracing::info!("Database migrations applied");
                }
                (Collaborators::postgres(pool.clone(), ids), Some(pool))
            }
        };

        let redis = match settings.redis.url.as_deref() {
            Some(url) => Some(broker::create_redis_client(url).await?),
            None => {
                tracing::info!("No Redis URL configured, broker publishing disabled");
                None
            }
        };

        let collaborators = match &redis {
            Some(conn) => collaborators.with_publisher(Arc::new(RedisPublisher::new(
                conn.clone(),
                settings.redis.channel.clone(),
            ))),
            None => collaborators,
        };

        let mut state = AppState::new(settings.clone(), collaborators);
        state.db = db;
        state.redis = redis;

        // Build router with middleware
        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        let addr = settings.server_addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
