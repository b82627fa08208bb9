//! Constants used throughout the accounting subsystem
//!
//! This module centralizes tuning values and sentinels so that hot-path code
//! never carries inline magic numbers.

/// Sharded counter tuning
pub mod counter {
    /// Default number of shards for striped counters.
    ///
    /// 16 shards keeps write contention negligible for the worker-thread
    /// counts this subsystem runs under (typically 4-32 workers) while the
    /// read-side sum stays cheap. Each shard occupies a full cache line, so
    /// 16 shards cost 1 KiB per counter.
    pub const DEFAULT_SHARDS: usize = 16;

    /// Upper bound on the shard count accepted from configuration.
    ///
    /// Past this point the read-side sum dominates and extra shards only
    /// waste memory.
    pub const MAX_SHARDS: usize = 512;

    // Shard counts must be non-zero; the counter constructor enforces it.
    const _NONZERO: () = assert!(DEFAULT_SHARDS > 0 && DEFAULT_SHARDS <= MAX_SHARDS);
}

/// Admission-control accounting
pub mod accounting {
    /// Ceiling sentinel meaning "effectively unlimited".
    ///
    /// The accounter starts with this value so a server that never calls
    /// `set_max_level` admits everything.
    pub const UNLIMITED: u64 = u64::MAX;
}

/// Connection-layer defaults
///
/// These mirror the server's connection settings; the accounting core only
/// carries them between configuration and the connection layer.
pub mod connection {
    /// Input buffer size per connection (32 KiB)
    pub const IN_BUFFER_SIZE: usize = 32 * 1024;

    /// Pending-request queue length above which a connection stops reading
    pub const REQUESTS_QUEUE_SIZE_THRESHOLD: usize = 100;

    /// Keep-alive timeout for idle connections (10 minutes)
    pub const KEEPALIVE_TIMEOUT_SECS: u64 = 10 * 60;
}
