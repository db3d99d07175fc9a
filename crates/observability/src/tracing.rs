//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize structured logging for the process.
///
/// JSON lines to stderr, level/module filtering via `RUST_LOG` (defaults to
/// `info`). `try_init` so repeated calls (tests, embedded use) are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .json()
        .with_current_span(false)
        .try_init();
}
