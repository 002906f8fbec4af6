//! Tracing setup for binaries embedding the assist core.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "WEBIDE_ASSIST_LOG";
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Filter from `WEBIDE_ASSIST_LOG`, falling back to `info`.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs a stderr fmt subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
