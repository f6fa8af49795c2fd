//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize process-wide tracing with JSON output.
///
/// Filtering is configurable via `RUST_LOG`. Safe to call multiple times
/// (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Human-readable variant for local runs and test debugging.
pub fn init_plain() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .compact()
        .with_target(false)
        .try_init();
}
