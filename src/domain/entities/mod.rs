//! # Domain Entities
//!
//! Core entities of the routing core and the collaborator traits used to
//! load and store them.
//!
//! ## Entities
//!
//! - **Message**: A persisted chat message (private or group)
//! - **GroupMember**: A user's membership in a group (read-only)
//! - **UserProfile**: Display fields of a user (read-only)
//!
//! ## Collaborator Traits
//!
//! Each entity has an associated trait defining data access. The traits are
//! implemented in the infrastructure layer (PostgreSQL and in-memory).

mod member;
mod message;
mod user;

// Re-export Message entity and related types
pub use message::{
    ContentPart, ContentType, DraftPart, HistoryFilter, Message, MessageDraft, MessageStore,
    MessageType, MessageUpdate, NewMessage, TargetType,
};

// Re-export GroupMember entity and related types
pub use member::{GroupMember, GroupMembership, MemberRole};

// Re-export UserProfile and related types
pub use user::{OnlineStatus, UserLookup, UserProfile};

#[cfg(test)]
pub use member::MockGroupMembership;
#[cfg(test)]
pub use message::MockMessageStore;
#[cfg(test)]
pub use user::MockUserLookup;
