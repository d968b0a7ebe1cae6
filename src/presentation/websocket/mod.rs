//! WebSocket Routing Core
//!
//! Live connections: registry, envelope codec, dispatch and the per-connection
//! loop.

pub mod codec;
pub mod dispatcher;
pub mod handler;
pub mod observer;
pub mod registry;
pub mod session;

pub use codec::{EnvelopeError, InboundEnvelope};
pub use dispatcher::Dispatcher;
pub use handler::{ws_handler, ConnectParams};
pub use observer::{DeliveryError, DeliveryObserver, TracingDeliveryObserver};
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use session::ConnectionState;
