//! HTTP API
//!
//! Routes and handlers for the REST endpoints.

pub mod handlers;
pub mod routes;
