//! In-flight response accounting and admission control
//!
//! The concurrent resource-accounting subsystem of a high-throughput
//! request server: low-contention counters track how many bytes of response
//! payload are in flight across all connections, enforce a configurable
//! ceiling as a backpressure signal, and roll up per-connection and
//! per-listener traffic statistics without cross-connection locking.
//!
//! # Building blocks
//! - [`counter::StripedCounter`] / [`counter::StripedRateCounter`]: the
//!   contention-reducing primitive everything else is built from.
//! - [`accounting::ResponseDataAccounter`]: shared outstanding-byte total,
//!   admission ceiling, running average completion latency.
//! - [`response::Response`]: per-request lifecycle object whose accounting
//!   guard pairs every `start_request` with exactly one `stop_request`,
//!   on every exit path.
//! - [`stats::ConnectionStats`] / [`stats::ListenerStats`]: write-owned
//!   counters merged on demand into commutative snapshots.
//!
//! # Flow
//! A connection accepts work, constructs a [`response::Response`] bound to
//! the shared accounter (accounting starts), the handler fills the payload,
//! the response moves through ready/sent/failed, and on drop the guard
//! stops accounting and folds the elapsed time into the running average.
//! The connection layer consults
//! [`accounting::ResponseDataAccounter::is_limit_reached`] before admitting
//! new work; what to do when it fires is its decision, not this crate's.

pub mod accounting;
pub mod config;
pub mod constants;
pub mod counter;
pub mod logging;
pub mod protocol;
pub mod response;
pub mod stats;
pub mod types;

pub use accounting::ResponseDataAccounter;
pub use config::{AccountingConfig, ConfigError, ConnectionConfig, ServerConfig, load_config};
pub use counter::{RateSample, StripedCounter, StripedRateCounter};
pub use protocol::{Http1Protocol, Http2Protocol, ResponseProtocol, ServerStatus};
pub use response::Response;
pub use stats::{
    ConnectionSnapshot, ConnectionStats, ListenerSnapshot, ListenerStats, StreamSnapshot,
    StreamStats,
};
pub use types::{ConnectionId, StreamId};
