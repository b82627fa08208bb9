//! Per-connection and per-listener traffic statistics
//!
//! Counters are write-owned: only the task(s) servicing a connection touch
//! that connection's [`ConnectionStats`], only the listener touches its own
//! connection counts. The hot reporting path never writes, it only reads
//! counters into [snapshot](crate::stats::ConnectionSnapshot) value types
//! and merges those; the sole lock guards the retained totals of closed
//! connections and is taken once per close and once per snapshot.

mod snapshot;

pub use snapshot::{ConnectionSnapshot, ListenerSnapshot, StreamSnapshot};

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::counter::{StripedCounter, StripedRateCounter};
use crate::types::ConnectionId;

/// Multiplexed-stream churn counters (HTTP/2)
///
/// Rate-windowed so the reporting layer can derive instantaneous stream
/// churn, not just lifetime totals.
#[derive(Debug, Default)]
pub struct StreamStats {
    opened: StripedRateCounter,
    closed: StripedRateCounter,
    resets: StripedRateCounter,
    parse_errors: StripedRateCounter,
    goaways: StripedRateCounter,
}

impl StreamStats {
    #[inline]
    pub fn stream_opened(&self) {
        self.opened.increment();
    }

    #[inline]
    pub fn stream_closed(&self) {
        self.closed.increment();
    }

    #[inline]
    pub fn stream_reset(&self) {
        self.resets.increment();
    }

    #[inline]
    pub fn stream_parse_error(&self) {
        self.parse_errors.increment();
    }

    #[inline]
    pub fn goaway(&self) {
        self.goaways.increment();
    }
}

/// Counters owned by exactly one connection
///
/// Incremented in place from the connection's request-processing tasks;
/// striped because several tasks of one connection may run on different
/// workers (HTTP/2 streams).
#[derive(Debug, Default)]
pub struct ConnectionStats {
    requests_parsed: StripedCounter,
    active_requests: StripedCounter,
    requests_processed: StripedCounter,
    streams: StreamStats,
}

impl ConnectionStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A request finished parsing on this connection.
    #[inline]
    pub fn request_parsed(&self) {
        self.requests_parsed.add(1);
    }

    /// A request entered processing.
    #[inline]
    pub fn request_started(&self) {
        self.active_requests.add(1);
    }

    /// A request finished processing (successfully or not).
    #[inline]
    pub fn request_completed(&self) {
        self.active_requests.add(-1);
        self.requests_processed.add(1);
    }

    /// Protocol-specific stream event counters.
    #[must_use]
    pub fn streams(&self) -> &StreamStats {
        &self.streams
    }
}

/// Counters owned by one listener, plus the connection stats it hands out
///
/// Connection counts are plain atomics: their write rate (one per accepted
/// or closed connection) is far too low to justify striping. Lifetime
/// totals of closed connections are folded into `closed_connections` on
/// deregistration so listener-level counters stay monotone across the
/// connection churn.
#[derive(Debug, Default)]
pub struct ListenerStats {
    active_connections: AtomicU64,
    connections_created: AtomicU64,
    connections_closed: AtomicU64,
    connections: DashMap<ConnectionId, Arc<ConnectionStats>>,
    closed_connections: Mutex<ConnectionSnapshot>,
}

impl ListenerStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly accepted connection; the returned stats are
    /// write-owned by that connection's tasks.
    pub fn register_connection(&self) -> (ConnectionId, Arc<ConnectionStats>) {
        let id = ConnectionId::next();
        let stats = Arc::new(ConnectionStats::new());
        self.connections.insert(id, Arc::clone(&stats));
        self.connections_created.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        debug!(%id, "connection registered");
        (id, stats)
    }

    /// Deregister a closed connection, folding its lifetime counters into
    /// the retained totals so they survive in later snapshots.
    pub fn deregister_connection(&self, id: ConnectionId) {
        if let Some((_, stats)) = self.connections.remove(&id) {
            let mut total = ConnectionSnapshot::from(stats.as_ref());
            // No writers remain; a residual active count is a read artifact.
            total.active_requests = 0;
            *self.closed_connections.lock().unwrap() += total;
            self.active_connections.fetch_sub(1, Ordering::Relaxed);
            self.connections_closed.fetch_add(1, Ordering::Relaxed);
            debug!(%id, "connection deregistered");
        }
    }

    /// Number of currently registered connections.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Point-in-time aggregation of this listener: every connection it
    /// currently owns plus retained totals of connections already closed.
    /// Individual fields may lag concurrent updates, which is acceptable
    /// for reporting.
    #[must_use]
    pub fn snapshot(&self) -> ListenerSnapshot {
        let mut connections = *self.closed_connections.lock().unwrap();
        for entry in self.connections.iter() {
            connections += ConnectionSnapshot::from(entry.value().as_ref());
        }
        ListenerSnapshot {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connections,
        }
    }
}
