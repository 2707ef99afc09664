//! Request ID allocation.
//!
//! Every outbound request carries an ID that the server echoes back in the
//! matching response. IDs are unique and strictly increasing within one
//! client instance.

use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe allocator of request IDs.
///
/// The counter is seeded from the wall clock in milliseconds, so IDs from a
/// restarted process do not collide with those of the previous run.
#[derive(Debug)]
pub struct RequestIdAllocator {
    counter: AtomicU64,
}

impl RequestIdAllocator {
    /// Seed from the current time.
    #[must_use]
    pub fn new() -> Self {
        let now = u64::try_from(tradews_core::now_ms()).unwrap_or_default();
        Self::with_seed(now)
    }

    /// Seed from an explicit value. The first ID is `seed + 1`.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            counter: AtomicU64::new(seed),
        }
    }

    /// The next ID as a number.
    pub fn next_value(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    /// The next ID in its wire form (decimal string).
    pub fn next_id(&self) -> String {
        self.next_value().to_string()
    }
}

impl Default for RequestIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
