//! Per-connection state

use std::time::{Duration, Instant};

use uuid::Uuid;

/// State owned by one connection loop.
#[derive(Debug)]
pub struct ConnectionState {
    pub connection_id: Uuid,
    pub frames_received: u64,
    pub last_seen: Instant,
}

impl ConnectionState {
    pub fn new(connection_id: Uuid) -> Self {
        Self {
            connection_id,
            frames_received: 0,
            last_seen: Instant::now(),
        }
    }

    /// Any inbound traffic, including pings, counts as liveness.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn record_frame(&mut self) {
        self.frames_received += 1;
        self.touch();
    }

    pub fn is_idle(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() >= timeout
    }
}
