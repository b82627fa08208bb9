//! Contention-reducing striped counters
//!
//! A single atomic becomes a serialization point once every request task on
//! every worker thread hammers it. These counters split the value across
//! independent cache-padded shards: each writer touches one shard, reads sum
//! all of them. Reads may race with writes, so a logically non-negative
//! counter can report a transiently negative sum; callers that need
//! non-negativity use [`StripedCounter::non_negative_read`].
//!
//! Shard selection is explicit rather than hidden in the primitive: each
//! thread is handed a stable slot by [`writer_slot`] on first use
//! (round-robin assignment), and callers that carry their own worker
//! identifier can bypass the sampling with [`StripedCounter::add_to_shard`].
//! This keeps the primitive testable without spinning up a worker pool.

use crossbeam_utils::CachePadded;
use std::cell::Cell;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::constants::counter::DEFAULT_SHARDS;

/// Next writer slot to hand out; wraps naturally via modulo at use sites.
static NEXT_WRITER_SLOT: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static WRITER_SLOT: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Stable per-thread writer slot, assigned round-robin on first use.
///
/// The slot is an unbounded index; counters reduce it modulo their own shard
/// count, so counters with different shard counts can share the same slot.
#[inline]
pub fn writer_slot() -> usize {
    WRITER_SLOT.with(|slot| match slot.get() {
        Some(s) => s,
        None => {
            let s = NEXT_WRITER_SLOT.fetch_add(1, Ordering::Relaxed);
            slot.set(Some(s));
            s
        }
    })
}

/// Signed counter striped across cache-padded atomic shards
///
/// The logical value is the sum over all shards. Writes are single Relaxed
/// `fetch_add`s on one shard and never block; reads may interleave with
/// writes and are eventually consistent: once no add is in flight, `read`
/// returns the exact sum of all deltas applied.
#[derive(Debug)]
pub struct StripedCounter {
    shards: Box<[CachePadded<AtomicI64>]>,
}

impl StripedCounter {
    /// Create a counter with the default shard count.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    /// Create a counter with an explicit shard count.
    ///
    /// # Panics
    /// Panics if `shards` is zero.
    #[must_use]
    pub fn with_shards(shards: usize) -> Self {
        assert!(shards > 0, "striped counter needs at least one shard");
        Self {
            shards: (0..shards)
                .map(|_| CachePadded::new(AtomicI64::new(0)))
                .collect(),
        }
    }

    /// Apply `delta` to the calling thread's shard. Never blocks.
    #[inline]
    pub fn add(&self, delta: i64) {
        self.add_to_shard(writer_slot(), delta);
    }

    /// Apply `delta` to an explicit shard (reduced modulo the shard count).
    ///
    /// Used by callers that already carry a worker identifier, and by tests
    /// that need deterministic shard placement.
    #[inline]
    pub fn add_to_shard(&self, slot: usize, delta: i64) {
        let idx = slot % self.shards.len();
        self.shards[idx].fetch_add(delta, Ordering::Relaxed);
    }

    /// Sum all shards.
    ///
    /// May be called concurrently with `add`; the result can be transiently
    /// negative for a logically non-negative counter when the read races a
    /// paired add/subtract across different shards. That is accepted, not an
    /// error.
    #[must_use]
    pub fn read(&self) -> i64 {
        self.shards
            .iter()
            .map(|shard| shard.load(Ordering::Relaxed))
            .sum()
    }

    /// Sum all shards, clamped to zero when the racy sum dips negative.
    #[must_use]
    pub fn non_negative_read(&self) -> u64 {
        self.read().max(0) as u64
    }

    /// Number of shards (for observability and tests).
    #[must_use]
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

impl Default for StripedCounter {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time reading of a [`StripedRateCounter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSample {
    /// Events accumulated since the window started
    pub value: u64,
    /// Elapsed time since the window started
    pub window: Duration,
}

/// Striped counter with a time window for instantaneous-rate reporting
///
/// Used for protocol-event rates (stream churn and the like) where the
/// reporting layer wants "how many, over how long" rather than a bare total.
#[derive(Debug)]
pub struct StripedRateCounter {
    counter: StripedCounter,
    window_start: Instant,
}

impl StripedRateCounter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counter: StripedCounter::new(),
            window_start: Instant::now(),
        }
    }

    /// Record one event on the calling thread's shard.
    #[inline]
    pub fn increment(&self) {
        self.counter.add(1);
    }

    /// Record `count` events on the calling thread's shard.
    #[inline]
    pub fn add(&self, count: u64) {
        self.counter.add(count as i64);
    }

    /// Read the accumulated value together with the window it covers.
    #[must_use]
    pub fn load(&self) -> RateSample {
        RateSample {
            value: self.counter.non_negative_read(),
            window: self.window_start.elapsed(),
        }
    }
}

impl Default for StripedRateCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateSample {
    /// Events per second over the sampled window; zero for an empty window.
    #[must_use]
    pub fn per_second(&self) -> f64 {
        let secs = self.window.as_secs_f64();
        if secs > 0.0 {
            self.value as f64 / secs
        } else {
            0.0
        }
    }
}
