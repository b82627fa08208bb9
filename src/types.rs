//! Domain newtypes shared across the crate
//!
//! Thin wrappers that keep connection ids, stream ids and byte totals from
//! being mixed up at call sites.

use derive_more::{Display, From, Into};
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic source for connection ids; uniqueness is all that matters.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection owned by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
#[display("conn-{_0}")]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate the next unique connection id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    #[inline]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Identifier of a multiplexed logical stream within one connection
///
/// Set once on a response by protocols that run many logical responses over
/// a single transport (HTTP/2), read-only thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From, Into)]
#[display("stream-{_0}")]
pub struct StreamId(u32);

impl StreamId {
    #[must_use]
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    #[inline]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}
