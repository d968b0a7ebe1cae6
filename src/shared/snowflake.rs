//! Snowflake ID Generator
//!
//! Time-ordered 64-bit message ids: a later id always sorts after an earlier
//! one from the same generator, so id order doubles as creation order.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Default epoch (2024-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH_MS: u64 = 1_704_067_200_000;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const MACHINE_MASK: u64 = (1 << MACHINE_BITS) - 1;

/// Snowflake ID generator
///
/// Layout: 41 bits of milliseconds since `epoch_ms`, 10 bits machine id,
/// 12 bits per-millisecond sequence.
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch_ms: u64,
    /// Packed `(timestamp << SEQUENCE_BITS) | sequence` of the last issued id.
    state: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a new generator for `machine_id` (0-1023).
    pub fn new(machine_id: u16, epoch_ms: u64) -> Self {
        Self {
            machine_id: machine_id as u64 & MACHINE_MASK,
            epoch_ms,
            state: AtomicU64::new(0),
        }
    }

    /// Generate a new id, strictly greater than every id issued before it.
    pub fn generate(&self) -> i64 {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let now = self.elapsed_ms();
            let last_ts = current >> SEQUENCE_BITS;
            let last_seq = current & SEQUENCE_MASK;

            // Clock went backwards or sequence exhausted: borrow from the next millisecond.
            let (ts, seq) = if now > last_ts {
                (now, 0)
            } else if last_seq < SEQUENCE_MASK {
                (last_ts, last_seq + 1)
            } else {
                (last_ts + 1, 0)
            };

            let next = (ts << SEQUENCE_BITS) | seq;
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let id = (ts << (MACHINE_BITS + SEQUENCE_BITS))
                        | (self.machine_id << SEQUENCE_BITS)
                        | seq;
                    return id as i64;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn elapsed_ms(&self) -> u64 {
        (Utc::now().timestamp_millis().max(0) as u64).saturating_sub(self.epoch_ms)
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(1, DEFAULT_EPOCH_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_ids_are_strictly_increasing() {
        let gen = SnowflakeGenerator::default();
        let mut last = 0;
        for _ in 0..10_000 {
            let id = gen.generate();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_id_embeds_current_time() {
        let gen = SnowflakeGenerator::default();
        let id = gen.generate();
        let now = Utc::now().timestamp_millis() as u64;
        let ts = ((id as u64) >> (MACHINE_BITS + SEQUENCE_BITS)) + DEFAULT_EPOCH_MS;
        assert!(ts <= now + 1);
        assert!(ts + 1000 > now);
    }

    #[test]
    fn test_unique_across_threads() {
        let gen = Arc::new(SnowflakeGenerator::new(7, DEFAULT_EPOCH_MS));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = gen.clone();
                std::thread::spawn(move || (0..2_000).map(|_| gen.generate()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
    }
}
