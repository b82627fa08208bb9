//! Immutable statistics snapshots with commutative merge
//!
//! A snapshot reads every counter exactly once into a plain value type.
//! Merging is field-wise addition, so it is commutative and associative by
//! construction: periodic reporting can combine connections and listeners
//! in any order, or in parallel, without coordination.

use std::ops::{Add, AddAssign};

use super::{ConnectionStats, StreamStats};

/// Point-in-time stream churn totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub opened: u64,
    pub closed: u64,
    pub resets: u64,
    pub parse_errors: u64,
    pub goaways: u64,
}

impl From<&StreamStats> for StreamSnapshot {
    fn from(stats: &StreamStats) -> Self {
        Self {
            opened: stats.opened.load().value,
            closed: stats.closed.load().value,
            resets: stats.resets.load().value,
            parse_errors: stats.parse_errors.load().value,
            goaways: stats.goaways.load().value,
        }
    }
}

impl AddAssign for StreamSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.opened += other.opened;
        self.closed += other.closed;
        self.resets += other.resets;
        self.parse_errors += other.parse_errors;
        self.goaways += other.goaways;
    }
}

impl Add for StreamSnapshot {
    type Output = Self;
    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

/// Point-in-time totals for one connection (or a merge of several)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub requests_parsed: u64,
    /// Clamped on read: the striped counter can dip negative transiently.
    pub active_requests: u64,
    pub requests_processed: u64,
    pub streams: StreamSnapshot,
}

impl From<&ConnectionStats> for ConnectionSnapshot {
    fn from(stats: &ConnectionStats) -> Self {
        Self {
            requests_parsed: stats.requests_parsed.non_negative_read(),
            active_requests: stats.active_requests.non_negative_read(),
            requests_processed: stats.requests_processed.non_negative_read(),
            streams: StreamSnapshot::from(&stats.streams),
        }
    }
}

impl AddAssign for ConnectionSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.requests_parsed += other.requests_parsed;
        self.active_requests += other.active_requests;
        self.requests_processed += other.requests_processed;
        self.streams += other.streams;
    }
}

impl Add for ConnectionSnapshot {
    type Output = Self;
    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}

/// Point-in-time totals for one listener, connections folded in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerSnapshot {
    pub active_connections: u64,
    pub connections_created: u64,
    pub connections_closed: u64,
    /// Merged snapshot of every connection this listener currently owns
    pub connections: ConnectionSnapshot,
}

impl AddAssign for ListenerSnapshot {
    fn add_assign(&mut self, other: Self) {
        self.active_connections += other.active_connections;
        self.connections_created += other.connections_created;
        self.connections_closed += other.connections_closed;
        self.connections += other.connections;
    }
}

impl Add for ListenerSnapshot {
    type Output = Self;
    fn add(mut self, other: Self) -> Self {
        self += other;
        self
    }
}
