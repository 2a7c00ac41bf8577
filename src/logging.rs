//! Diagnostic logging to stderr via `tracing`.
//!
//! `PARLANCE_LOG` takes an `EnvFilter` directive string and overrides the
//! level picked from `--verbose`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV_VAR: &str = "PARLANCE_LOG";

pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "parlance=debug,warn"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
