//! Object-id style identifier generation.
//!
//! Layout of the 12 bytes: 4-byte big-endian unix seconds, 5-byte value
//! fixed for the generator's lifetime, 3-byte big-endian counter.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Clock, IdGenerator, MovieId};

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

const COUNTER_MASK: u32 = 0x00ff_ffff;

pub struct ObjectIdGenerator<C: Clock = SystemClock> {
    clock: C,
    process_unique: [u8; 5],
    counter: AtomicU32,
}

impl ObjectIdGenerator<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for ObjectIdGenerator<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> ObjectIdGenerator<C> {
    /// `RandomState` is seeded per process, which is all the randomness needed here.
    pub fn with_clock(clock: C) -> Self {
        let mut h = RandomState::new().build_hasher();
        h.write_u128(nanos_since_epoch(clock.now()));
        h.write_u32(std::process::id());
        let seed = h.finish().to_be_bytes();
        let mut process_unique = [0u8; 5];
        process_unique.copy_from_slice(&seed[..5]);
        let counter = u32::from_be_bytes([0, seed[5], seed[6], seed[7]]);
        Self {
            clock,
            process_unique,
            counter: AtomicU32::new(counter),
        }
    }

    fn next_counter(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK
    }
}

impl<C: Clock> IdGenerator for ObjectIdGenerator<C> {
    fn next_id(&self) -> MovieId {
        let secs = self
            .clock
            .now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let count = self.next_counter();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.process_unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        MovieId::from_bytes(bytes)
    }
}

fn nanos_since_epoch(t: SystemTime) -> u128 {
    t.duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0)
}
