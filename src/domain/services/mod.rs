//! # Domain Services
//!
//! Outbound ports the application services talk through. Implementations
//! live in the presentation layer (live connections) and the infrastructure
//! layer (broker, token validation).
//!
//! ## Ports
//!
//! - **Broadcaster**: Best-effort delivery of envelopes to connected users
//! - **MessagePublisher**: Fire-and-forget publishing of stored messages to a broker
//! - **TokenValidator**: Resolving a bearer token to a user id

mod broadcaster;
mod publisher;
mod token;

pub use broadcaster::*;
pub use publisher::*;
pub use token::*;
