//! Tests for the shared response data accounter
//!
//! Covers the admission-control signal, the average completion latency and
//! convergence of the outstanding-byte total under concurrent start/stop
//! pressure.

use inflight::ResponseDataAccounter;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// The documented three-request scenario with injected timestamps
#[test]
fn test_scenario_three_requests() {
    let accounter = ResponseDataAccounter::new();
    let start = Instant::now();

    accounter.start_request(100, start);
    accounter.start_request(200, start);
    accounter.start_request(50, start);
    assert_eq!(accounter.current_level(), 350);

    accounter.stop_request_at(100, start, start + Duration::from_millis(10));
    assert_eq!(accounter.current_level(), 250);
    assert_eq!(accounter.avg_request_time(), Duration::from_millis(10));

    accounter.stop_request_at(200, start, start + Duration::from_millis(20));
    accounter.stop_request_at(50, start, start + Duration::from_millis(30));
    assert_eq!(accounter.current_level(), 0);
    assert_eq!(accounter.avg_request_time(), Duration::from_millis(20));
}

/// Ceiling 300: 350 outstanding trips the limit, dropping below clears it
#[test]
fn test_scenario_ceiling_transition() {
    let accounter = ResponseDataAccounter::new();
    accounter.set_max_level(300);
    let now = Instant::now();

    accounter.start_request(100, now);
    accounter.start_request(200, now);
    accounter.start_request(50, now);
    assert!(accounter.is_limit_reached());

    accounter.stop_request(100, now);
    // 250 outstanding <= 300
    assert!(!accounter.is_limit_reached());

    accounter.stop_request(200, now);
    accounter.stop_request(50, now);
    assert_eq!(accounter.current_level(), 0);
}

#[test]
fn test_limit_is_strict_greater_than() {
    let accounter = ResponseDataAccounter::new();
    accounter.set_max_level(100);
    let now = Instant::now();

    accounter.start_request(100, now);
    assert_eq!(accounter.current_level(), accounter.max_level());
    assert!(!accounter.is_limit_reached());

    accounter.start_request(1, now);
    assert!(accounter.is_limit_reached());

    accounter.stop_request(1, now);
    accounter.stop_request(100, now);
}

#[test]
fn test_avg_request_time_without_completions() {
    let accounter = ResponseDataAccounter::new();
    let now = Instant::now();
    accounter.start_request(10, now);
    // Starts alone never move the average
    assert_eq!(accounter.avg_request_time(), Duration::ZERO);
    accounter.stop_request(10, now);
}

/// Interleaved start/stop triples from many threads converge to zero
#[test]
fn test_concurrent_interleavings_converge() {
    let accounter = Arc::new(ResponseDataAccounter::new());
    let mut handles = Vec::new();

    for t in 1..=16usize {
        let accounter = Arc::clone(&accounter);
        handles.push(thread::spawn(move || {
            let create = Instant::now();
            let mut outstanding = Vec::new();
            for i in 0..2_000usize {
                let size = t * 100 + i % 13;
                accounter.start_request(size, create);
                outstanding.push(size);
                // Stop in bursts to interleave starts and stops
                if i % 5 == 0 {
                    for size in outstanding.drain(..) {
                        accounter.stop_request(size, create);
                    }
                }
            }
            for size in outstanding.drain(..) {
                accounter.stop_request(size, create);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(accounter.current_level(), 0);
    assert!(!accounter.is_limit_reached());
}

/// Ceiling configured through ServerConfig::apply_to
#[test]
fn test_config_applies_ceiling() {
    use inflight::{AccountingConfig, ServerConfig};

    let accounter = ResponseDataAccounter::new();
    let config = ServerConfig {
        accounting: AccountingConfig {
            max_response_data_size_mb: 2,
            ..Default::default()
        },
        ..Default::default()
    };
    config.apply_to(&accounter);
    assert_eq!(accounter.max_level(), 2 * 1024 * 1024);

    let now = Instant::now();
    accounter.start_request(2 * 1024 * 1024 + 1, now);
    assert!(accounter.is_limit_reached());
    accounter.stop_request(2 * 1024 * 1024 + 1, now);
}
