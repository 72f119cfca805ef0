//! Diagnostic logging setup for the binary.
//!
//! The library only emits `tracing` events. User-facing messages go through
//! [`crate::output::OutputFormatter`]; the log is for troubleshooting.

use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding an `EnvFilter` directive, e.g. `dropclear=debug`.
pub const LOG_ENV: &str = "DROPCLEAR_LOG";

/// Filter directive for a `-v` count when the environment sets none.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Installs a stderr subscriber. Calling it twice is harmless.
pub fn init_logging(verbosity: u8) {
    let directive = env::var(LOG_ENV).unwrap_or_else(|_| default_directive(verbosity).to_string());
    let filter_layer =
        EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(default_directive(0)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .try_init();
}
