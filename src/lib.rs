//! # Chat Router Library
//!
//! The real-time message routing core of a chat backend:
//! - Connection registry mapping each online user to one live WebSocket
//! - Envelope dispatch for chat, presence and acknowledgement events
//! - Private and group fan-out with best-effort delivery
//! - Cursor-paginated history and read tracking over HTTP
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Message, membership and user types plus the collaborator traits
//! - **Application Layer**: Chat, presence and history services and DTOs
//! - **Infrastructure Layer**: PostgreSQL, in-memory and Redis implementations
//! - **Presentation Layer**: HTTP handlers and the WebSocket routing core
//!
//! ## Module Structure
//!
//! ```text
//! chat_router/
//! +-- config/         Configuration management
//! +-- domain/         Entities, events and outbound ports
//! +-- application/    Services and DTOs
//! +-- infrastructure/ Storage, broker and metrics implementations
//! +-- presentation/   HTTP routes and the connection registry
//! +-- shared/         Common utilities (errors, validation, snowflake IDs)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core types
pub mod domain;

// Application layer - Chat services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
