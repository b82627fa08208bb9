//! Server-wide accounting of in-flight response bytes
//!
//! One [`ResponseDataAccounter`] is shared by every connection a listener
//! serves. Each response registers its declared size for its whole lifetime
//! (see [`crate::response::Response`]); the running total is the
//! backpressure signal the connection layer consults before admitting new
//! work. All operations are plain atomic arithmetic: they never block, never
//! allocate, and never fail, because they run on every request's hot path.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::constants::accounting::UNLIMITED;
use crate::counter::StripedCounter;

/// Aggregate of outstanding response bytes with an admission ceiling
///
/// At any quiescent point (no start/stop in flight) the current level equals
/// the sum of sizes passed to `start_request` calls not yet matched by a
/// `stop_request`. In between, reads are eventually consistent.
#[derive(Debug)]
pub struct ResponseDataAccounter {
    /// Outstanding bytes. Signed: a stop may land before a racing read sees
    /// the matching start.
    current: AtomicI64,
    /// Admission ceiling; `UNLIMITED` until configured.
    max: AtomicU64,
    /// Completed requests, striped to keep the stop path contention-free.
    count: StripedCounter,
    /// Sum of completion times in whole microseconds.
    time_sum: StripedCounter,
}

impl ResponseDataAccounter {
    /// Create an accounter with the default shard count and no ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shards(crate::constants::counter::DEFAULT_SHARDS)
    }

    /// Create an accounter whose latency counters use `shards` shards.
    /// Sized from configuration at listener startup.
    #[must_use]
    pub fn with_shards(shards: usize) -> Self {
        Self {
            current: AtomicI64::new(0),
            max: AtomicU64::new(UNLIMITED),
            count: StripedCounter::with_shards(shards),
            time_sum: StripedCounter::with_shards(shards),
        }
    }

    /// Register `size` bytes as in flight.
    ///
    /// Called exactly once per response, at construction, by its accounting
    /// guard. `create_time` is carried by the guard and handed back to the
    /// matching [`stop_request`](Self::stop_request).
    #[inline]
    pub fn start_request(&self, size: usize, _create_time: Instant) {
        self.current.fetch_add(size as i64, Ordering::Relaxed);
    }

    /// Release `size` bytes and fold the elapsed lifetime into the average.
    ///
    /// Called exactly once per response, paired with its `start_request`,
    /// regardless of whether the response was sent, failed, or abandoned.
    #[inline]
    pub fn stop_request(&self, size: usize, create_time: Instant) {
        self.stop_request_at(size, create_time, Instant::now());
    }

    /// [`stop_request`](Self::stop_request) with an explicit "now".
    ///
    /// Lets tests inject a clock; production paths go through
    /// `stop_request`.
    #[inline]
    pub fn stop_request_at(&self, size: usize, create_time: Instant, now: Instant) {
        self.current.fetch_sub(size as i64, Ordering::Relaxed);
        let elapsed = now.saturating_duration_since(create_time);
        self.time_sum.add(elapsed.as_micros() as i64);
        self.count.add(1);
    }

    /// Current outstanding bytes. Approximate while traffic is in flight,
    /// exact at quiescence; clamped to zero against read/write races.
    #[must_use]
    #[inline]
    pub fn current_level(&self) -> u64 {
        self.current.load(Ordering::Relaxed).max(0) as u64
    }

    /// Configured admission ceiling.
    #[must_use]
    #[inline]
    pub fn max_level(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    /// Configure the admission ceiling. Set once at startup from config;
    /// safe to call at any time.
    #[inline]
    pub fn set_max_level(&self, max: u64) {
        self.max.store(max, Ordering::Relaxed);
    }

    /// The sole admission-control signal: true iff outstanding bytes exceed
    /// the ceiling. What to do about it (stop accepting, shed load) is the
    /// connection layer's decision.
    #[must_use]
    #[inline]
    pub fn is_limit_reached(&self) -> bool {
        self.current_level() > self.max_level()
    }

    /// Average completion time across all stopped requests; zero when none
    /// have stopped yet.
    #[must_use]
    pub fn avg_request_time(&self) -> Duration {
        let count = self.count.non_negative_read();
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(self.time_sum.non_negative_read() / count)
    }
}

impl Default for ResponseDataAccounter {
    fn default() -> Self {
        Self::new()
    }
}
