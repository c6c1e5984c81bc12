//! Logging initialization shared by the daemon and the CNI entry point.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Output goes to stderr so the CNI result on stdout stays machine-readable.
/// `RUST_LOG` overrides `default_level` when set.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
