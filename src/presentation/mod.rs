//! Presentation Layer
//!
//! HTTP routes, middleware and the live connection endpoint.

pub mod http;
pub mod middleware;
pub mod websocket;
