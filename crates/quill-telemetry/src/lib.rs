//! Tracing setup for Quill
//!
//! Structured logs via the `tracing` ecosystem; the filter comes from
//! `RUST_LOG` with a caller-supplied default.

use tracing_subscriber::EnvFilter;

/// Initialize the global subscriber
///
/// Safe to call once per process; later calls are ignored so tests that
/// race on initialization do not panic.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
