//! # Domain Layer
//!
//! Core types of the routing core, independent of transport and storage.
//!
//! ## Structure
//!
//! - **entities**: Message, GroupMember, UserProfile and their collaborator traits
//! - **events**: Realtime event types and the response envelope pushed to clients
//! - **services**: Outbound ports (broadcasting to connections, broker publishing)

pub mod entities;
pub mod events;
pub mod services;

// Re-export commonly used types
pub use entities::*;
pub use events::*;
pub use services::*;
