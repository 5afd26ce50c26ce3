//! Diagnostic logging.
//!
//! Logs go to stderr so stdout carries only the publish status lines.
//! `RUST_LOG` overrides the default level unless `--verbose` is given.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Call once, before any command runs.
pub fn init(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
