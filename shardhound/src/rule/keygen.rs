//! Generated keys.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use parking_lot::Mutex;

/// Draws keys for auto-increment columns an INSERT didn't supply.
pub trait KeyGenerator: Send + Sync + std::fmt::Debug {
    fn next_key(&self) -> i64;
}

// 2016-11-01 00:00:00 UTC
const EPOCH_MILLIS: i64 = 1_477_958_400_000;

const SEQUENCE_BITS: u32 = 12;
const WORKER_BITS: u32 = 10;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake-style key generator: 41 bits of milliseconds since epoch,
/// 10 bits of worker id, 12 bits of per-millisecond sequence.
#[derive(Debug)]
pub struct SnowflakeKeyGenerator {
    worker_id: u32,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    last_millis: i64,
    sequence: i64,
}

impl SnowflakeKeyGenerator {
    pub fn new(worker_id: u32) -> Self {
        assert!(worker_id < (1 << WORKER_BITS), "worker id out of range");
        Self {
            worker_id,
            state: Mutex::new(State::default()),
        }
    }
}

impl KeyGenerator for SnowflakeKeyGenerator {
    fn next_key(&self) -> i64 {
        let mut state = self.state.lock();
        let mut millis = Utc::now().timestamp_millis();

        if millis < state.last_millis {
            // clock went backwards; reuse the last timestamp
            millis = state.last_millis;
        }

        if millis == state.last_millis {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                // sequence exhausted for this millisecond
                while millis <= state.last_millis {
                    millis = Utc::now().timestamp_millis();
                }
            }
        } else {
            state.sequence = 0;
        }
        state.last_millis = millis;

        ((millis - EPOCH_MILLIS) << (WORKER_BITS + SEQUENCE_BITS))
            | ((self.worker_id as i64) << SEQUENCE_BITS)
            | state.sequence
    }
}

/// Monotonic counter. Deterministic alternative to snowflake keys,
/// used by tests and single-writer deployments.
#[derive(Debug, Default)]
pub struct IncrementKeyGenerator {
    counter: AtomicI64,
}

impl IncrementKeyGenerator {
    pub fn starting_at(start: i64) -> Self {
        Self {
            counter: AtomicI64::new(start - 1),
        }
    }
}

impl KeyGenerator for IncrementKeyGenerator {
    fn next_key(&self) -> i64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_snowflake_monotonic() {
        let generator = SnowflakeKeyGenerator::new(1);
        let mut last = 0;
        for _ in 0..4096 {
            let key = generator.next_key();
            assert!(key > last);
            last = key;
        }
    }

    #[test]
    fn test_worker_id_in_key() {
        let generator = SnowflakeKeyGenerator::new(7);
        let key = generator.next_key();
        assert_eq!((key >> SEQUENCE_BITS) & ((1 << WORKER_BITS) - 1), 7);
    }

    #[test]
    fn test_increment() {
        let generator = IncrementKeyGenerator::starting_at(100);
        assert_eq!(generator.next_key(), 100);
        assert_eq!(generator.next_key(), 101);
    }
}
