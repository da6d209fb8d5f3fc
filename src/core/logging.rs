//! Tracing subscriber setup for the `archiflow` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. Logs go to stderr so JSON on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "ARCHIFLOW_LOG";

/// `ARCHIFLOW_LOG` wins, then `RUST_LOG`, then `default_filter`.
pub fn build_filter(default_filter: &str) -> EnvFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| EnvFilter::try_new(v).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter))
}

pub fn init_logging(default_filter: &str) {
    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(default_filter))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
