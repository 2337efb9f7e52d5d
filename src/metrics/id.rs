//! Command id generation.
//!
//! Ids are opaque strings, unique within the lifetime of the process. The
//! generator is injected wherever records are created so tests can supply
//! deterministic ids.

use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of process-unique command ids.
pub trait IdGenerator: Send + Sync {
    /// Produce the next id.
    fn next_id(&self) -> String;
}

const TIME_UNIT_MS: i64 = 10;
const SEQUENCE_BITS: u32 = 8;
const MACHINE_BITS: u32 = 16;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Time-ordered id generator.
///
/// Layout of the numeric id, most significant first: elapsed time since
/// 2014-09-01 UTC in 10ms units, an 8-bit per-unit sequence, and a 16-bit
/// machine id. When the sequence is exhausted within one time unit the
/// generator moves on to the next unit instead of sleeping, so ids stay unique
/// but may run slightly ahead of the wall clock under bursts.
#[derive(Debug)]
pub struct TimeBasedIdGenerator {
    epoch_ms: i64,
    machine_id: u16,
    /// `elapsed_units << SEQUENCE_BITS | sequence` of the last issued id.
    state: AtomicU64,
}

impl TimeBasedIdGenerator {
    /// Create a generator stamping ids with the given machine id.
    pub fn new(machine_id: u16) -> Self {
        let epoch_ms = Utc
            .with_ymd_and_hms(2014, 9, 1, 0, 0, 0)
            .single()
            .map(|t| t.timestamp_millis())
            .unwrap_or(0);

        Self {
            epoch_ms,
            machine_id,
            state: AtomicU64::new(0),
        }
    }

    /// The machine id embedded in every id.
    pub fn machine_id(&self) -> u16 {
        self.machine_id
    }

    fn elapsed_units(&self) -> u64 {
        let elapsed = Utc::now().timestamp_millis() - self.epoch_ms;
        (elapsed.max(0) / TIME_UNIT_MS) as u64
    }

    /// Produce the next id as a number.
    pub fn next_numeric_id(&self) -> u64 {
        let now = self.elapsed_units();
        let mut current = self.state.load(Ordering::Relaxed);

        loop {
            let last_units = current >> SEQUENCE_BITS;
            let last_seq = current & SEQUENCE_MASK;

            let next = if now > last_units {
                now << SEQUENCE_BITS
            } else if last_seq < SEQUENCE_MASK {
                current + 1
            } else {
                (last_units + 1) << SEQUENCE_BITS
            };

            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    let units = next >> SEQUENCE_BITS;
                    let seq = next & SEQUENCE_MASK;
                    return (units << (SEQUENCE_BITS + MACHINE_BITS))
                        | (seq << MACHINE_BITS)
                        | u64::from(self.machine_id);
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for TimeBasedIdGenerator {
    /// Machine id derived from the low bits of the process id.
    fn default() -> Self {
        Self::new((std::process::id() & 0xFFFF) as u16)
    }
}

impl IdGenerator for TimeBasedIdGenerator {
    fn next_id(&self) -> String {
        self.next_numeric_id().to_string()
    }
}

/// Deterministic generator issuing "1", "2", "3", ...
#[derive(Debug, Default)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the sequence after `start` (the first id is `start + 1`).
    pub fn starting_after(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        (self.next.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }
}
