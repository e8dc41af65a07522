//! Diagnostic logging setup.
//!
//! Binaries install one global subscriber at startup, either human-readable
//! ([`init_subscriber`]) or JSON lines ([`init_json_subscriber`]). Both write
//! to stderr so stdout stays free for command output. Tests use
//! [`capture_logs`] instead.

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set and valid, else `level`.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a compact stderr subscriber filtered at `level`, e.g. `"info"`.
///
/// Only the first call in a process takes effect.
pub fn init_subscriber(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Install a stderr subscriber emitting one JSON object per event.
///
/// Only the first call in a process takes effect.
pub fn init_json_subscriber(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stderr)
        .json()
        .try_init();
}
