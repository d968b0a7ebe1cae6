//! Delivery port over live connections.

use std::collections::HashSet;

use crate::domain::events::ResponseEnvelope;

/// Best-effort sender to connected users.
///
/// Every method is non-blocking and infallible from the caller's point of
/// view: unreachable recipients are skipped and failed writes are reported
/// out of band. The return values count successful enqueues.
#[cfg_attr(test, mockall::automock)]
pub trait Broadcaster: Send + Sync {
    /// Send to a single user. Returns whether the frame was enqueued.
    fn send_to_one(&self, user_id: i64, envelope: &ResponseEnvelope) -> bool;

    /// Send the same frame to each listed user.
    fn send_to_many(&self, user_ids: &[i64], envelope: &ResponseEnvelope) -> usize;

    /// Send to every connected user.
    fn send_to_all(&self, envelope: &ResponseEnvelope) -> usize;

    /// Snapshot of connected user ids. May be stale by the time it is used.
    fn online_user_ids(&self) -> HashSet<i64>;

    fn is_online(&self, user_id: i64) -> bool;
}
