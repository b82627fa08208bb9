//! Tests for statistics aggregation across connections and listeners
//!
//! Merge order must never affect totals: snapshots combine via field-wise
//! addition, which the reporting layer relies on to fold connections and
//! listeners in any order, or in parallel.

use inflight::{ConnectionSnapshot, ConnectionStats, ListenerStats};
use std::sync::Arc;
use std::thread;

fn populated(parsed: u64, started: u64, completed: u64) -> ConnectionStats {
    let stats = ConnectionStats::new();
    for _ in 0..parsed {
        stats.request_parsed();
    }
    for _ in 0..started {
        stats.request_started();
    }
    for _ in 0..completed {
        stats.request_completed();
    }
    stats
}

#[test]
fn test_merge_order_does_not_matter() {
    let a = ConnectionSnapshot::from(&populated(3, 3, 1));
    let b = ConnectionSnapshot::from(&populated(7, 5, 5));
    let c = ConnectionSnapshot::from(&populated(11, 2, 0));

    let abc = a + b + c;
    let cab = c + a + b;
    let pairwise = (a + b) + c;
    let other_pairing = a + (b + c);

    assert_eq!(abc, cab);
    assert_eq!(abc, pairwise);
    assert_eq!(abc, other_pairing);

    assert_eq!(abc.requests_parsed, 21);
    assert_eq!(abc.active_requests, 4);
    assert_eq!(abc.requests_processed, 6);
}

#[test]
fn test_listener_snapshot_disjoint_fields() {
    let listener = ListenerStats::new();
    let (id, conn) = listener.register_connection();
    conn.request_parsed();
    conn.request_started();

    let snap = listener.snapshot();
    // Listener-level fields come from the listener's own atomics
    assert_eq!(snap.active_connections, 1);
    assert_eq!(snap.connections_created, 1);
    assert_eq!(snap.connections_closed, 0);
    // Connection-level fields come from the merged connection stats
    assert_eq!(snap.connections.requests_parsed, 1);
    assert_eq!(snap.connections.active_requests, 1);

    listener.deregister_connection(id);
}

#[test]
fn test_two_listener_reports_merge() {
    let front = ListenerStats::new();
    let admin = ListenerStats::new();

    let (_id, conn) = front.register_connection();
    conn.request_parsed();
    conn.streams().stream_opened();
    let (_id, conn) = admin.register_connection();
    conn.request_parsed();
    conn.request_parsed();

    let report = front.snapshot() + admin.snapshot();
    assert_eq!(report.active_connections, 2);
    assert_eq!(report.connections_created, 2);
    assert_eq!(report.connections.requests_parsed, 3);
    assert_eq!(report.connections.streams.opened, 1);
}

/// Snapshots taken while connections are still writing are best-effort;
/// once the writers are done the totals are exact.
#[test]
fn test_concurrent_writers_exact_at_quiescence() {
    let listener = Arc::new(ListenerStats::new());
    let mut handles = Vec::new();

    for _ in 0..4 {
        let listener = Arc::clone(&listener);
        handles.push(thread::spawn(move || {
            let (id, conn) = listener.register_connection();
            for _ in 0..10_000 {
                conn.request_parsed();
                conn.request_started();
                conn.request_completed();
            }
            id
        }));
    }

    // Interleave reads with the writers; racing values only have to be
    // bounded, not mutually consistent
    for _ in 0..50 {
        let snap = listener.snapshot();
        assert!(snap.connections.requests_parsed <= 40_000);
        assert!(snap.connections.requests_processed <= 40_000);
    }

    let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let snap = listener.snapshot();
    assert_eq!(snap.connections.requests_parsed, 40_000);
    assert_eq!(snap.connections.requests_processed, 40_000);
    assert_eq!(snap.connections.active_requests, 0);

    for id in ids {
        listener.deregister_connection(id);
    }
    let snap = listener.snapshot();
    assert_eq!(snap.connections_closed, 4);
    // Lifetime totals are retained after every connection has closed
    assert_eq!(snap.connections.requests_parsed, 40_000);
    assert_eq!(snap.connections.requests_processed, 40_000);
}

#[test]
fn test_closed_connection_totals_merge_with_live() {
    let listener = ListenerStats::new();

    let (id_closed, conn) = listener.register_connection();
    for _ in 0..5 {
        conn.request_parsed();
        conn.request_started();
        conn.request_completed();
    }
    listener.deregister_connection(id_closed);
    drop(conn);

    let (_id_live, conn) = listener.register_connection();
    conn.request_parsed();
    conn.request_started();

    let snap = listener.snapshot();
    assert_eq!(snap.connections_created, 2);
    assert_eq!(snap.connections_closed, 1);
    assert_eq!(snap.active_connections, 1);
    assert_eq!(snap.connections.requests_parsed, 6);
    assert_eq!(snap.connections.requests_processed, 5);
    assert_eq!(snap.connections.active_requests, 1);
}
