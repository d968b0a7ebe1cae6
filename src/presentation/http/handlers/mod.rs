//! HTTP Handlers
//!
//! Request handlers for the HTTP endpoints next to the realtime socket.

pub mod health;
pub mod message;
