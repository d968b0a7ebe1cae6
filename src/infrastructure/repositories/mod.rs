//! Repository Implementations
//!
//! PostgreSQL implementations of the domain collaborator traits.
//!
//! ## Available Repositories
//!
//! - **PgMessageStore** - Message persistence, read tracking and history pagination
//! - **PgGroupMembership** - Group membership lookups (read-only)
//! - **PgUserLookup** - User display fields (read-only)
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sqlx::PgPool;
//! use chat_router::infrastructure::repositories::{PgGroupMembership, PgMessageStore, PgUserLookup};
//! use chat_router::shared::snowflake::SnowflakeGenerator;
//!
//! fn setup_repositories(pool: PgPool) {
//!     let messages = PgMessageStore::new(pool.clone(), Arc::new(SnowflakeGenerator::default()));
//!     let groups = PgGroupMembership::new(pool.clone());
//!     let users = PgUserLookup::new(pool);
//! }
//! ```

pub mod member_repository;
pub mod message_repository;
pub mod user_repository;

pub use member_repository::PgGroupMembership;
pub use message_repository::PgMessageStore;
pub use user_repository::PgUserLookup;
