//! Logging setup for host applications.

use tracing_subscriber::EnvFilter;

/// Installs a global `tracing` subscriber formatting to stderr.
///
/// The filter is read from `RUST_LOG`, defaulting to `info`. Calling this
/// more than once (or alongside a subscriber installed by the host) is
/// harmless; later installations are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
