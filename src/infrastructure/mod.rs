//! Infrastructure Layer
//!
//! Implementations of the domain collaborators and external services:
//! - Database repositories (PostgreSQL)
//! - In-memory collaborators
//! - Broker publishing (Redis)
//! - Prometheus metrics

pub mod broker;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod repositories;
