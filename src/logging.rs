//! Logging setup for binaries embedding this crate
//!
//! Library code only emits `tracing` events; subscribers belong to the
//! embedding server. This helper exists for tests, examples and small
//! deployments that want the conventional RUST_LOG-driven stdout setup.

use tracing_subscriber::EnvFilter;

/// Initialize a stdout subscriber filtered by RUST_LOG (default "info").
///
/// Returns quietly if a global subscriber is already installed, so tests
/// can call it repeatedly.
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stdout)
        .try_init();
}
