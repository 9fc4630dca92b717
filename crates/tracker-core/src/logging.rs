//! Structured JSON logging setup.

use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Install the global JSON subscriber on stderr.
///
/// `RUST_LOG` wins when set. Otherwise `quiet` keeps only errors and the
/// default is `info`. Calling this twice is harmless; the second install is
/// ignored.
pub fn init_logging(quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet)));

    let layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}

/// Milliseconds since `started`, for `elapsed_ms` log fields.
pub fn elapsed_ms(started: Instant) -> u64 {
    duration_ms(started.elapsed())
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn default_directive(quiet: bool) -> &'static str {
    if quiet { "error" } else { "info" }
}
