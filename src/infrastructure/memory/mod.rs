//! In-Memory Collaborators
//!
//! Process-local implementations of the collaborator traits, used by the
//! `memory` storage backend and by tests. Nothing survives a restart.

mod directory;
mod message_store;

pub use directory::{InMemoryGroupDirectory, InMemoryUserDirectory};
pub use message_store::InMemoryMessageStore;
