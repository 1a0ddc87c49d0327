//! Diagnostic logging for chordhub.
//!
//! User-facing output goes through the terminal macros in the crate root.
//! Everything else (requests, token refreshes, store failures) is emitted
//! with `tracing` and written to stderr, so it never mixes with command
//! output that may be piped.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "chordhub=info,warn";
const VERBOSE_FILTER: &str = "chordhub=debug,reqwest=info,warn";

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence. Without it, chordhub logs at INFO and other
/// crates at WARN; `verbose` raises chordhub to DEBUG.
pub fn init_logging(verbose: bool) {
    let default = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time();

    // Only the first call installs a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
