//! Structured logging setup for the command-line binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "tune_reporting=debug"
    } else {
        "tune_reporting=info"
    }
}

/// Install a stderr subscriber. `RUST_LOG` wins over `verbose`.
///
/// Calling this twice is harmless; the second subscriber is discarded.
pub fn init_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
