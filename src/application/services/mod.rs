//! Application Services
//!
//! Use cases that coordinate the domain collaborators and ports.
//!
//! ## Available Services
//!
//! - **ChatService**: Validate, persist, acknowledge and fan out chat submissions
//! - **PresenceService**: Push status changes to users sharing a group
//! - **MessageQueryService**: Cursor-paginated history and read tracking
//! - **JwtTokenValidator**: Bearer token verification

pub mod auth_service;
pub mod chat_service;
pub mod message_query_service;
pub mod presence_service;

pub use auth_service::{Claims, JwtTokenValidator};
pub use chat_service::{group_recipients, ChatError, ChatService, DEFAULT_MAX_CONTENT_LENGTH};
pub use message_query_service::{MessageQueryService, QueryError};
pub use presence_service::{related_user_ids, PresenceError, PresenceService};
