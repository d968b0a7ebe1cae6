//! # Chat Router
//!
//! Real-time message routing server.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Storage collaborators (in-memory or PostgreSQL)
//! - Optional Redis publishing
//! - HTTP/WebSocket server

use anyhow::Result;
use tracing::info;

use chat_router::config::Settings;
use chat_router::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    chat_router::telemetry::init_tracing();

    info!("Starting Chat Router...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        storage = ?settings.storage.backend,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    info!("Server stopped");
    Ok(())
}
