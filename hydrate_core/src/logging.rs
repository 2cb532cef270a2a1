//! Tracing setup for the `hydrate` binary.
//!
//! The library only emits events. Recovered storage problems (dropped
//! elements, session-only writes, corrupt payloads) are logged at `warn`,
//! record and goal changes at `info`, and gateway reads and writes at `debug`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter: only recovered storage problems reach the terminal
pub const DEFAULT_LEVEL: &str = "warn";

/// Install the subscriber used by the command line
///
/// Events go to stderr so `hydrate export` and `hydrate stats --json` can be
/// piped. `RUST_LOG` overrides the level, e.g. `RUST_LOG=hydrate_core=debug`
/// to trace every store access.
pub fn init() {
    init_with_level(DEFAULT_LEVEL)
}

/// Like [`init`] with a different fallback filter when `RUST_LOG` is unset
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();
}

#[cfg(test)]
pub(crate) fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("hydrate_core=debug"))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_ignored() {
        init_test();
        init_with_level("info");
        tracing::warn!(key = "water-records", "write kept for this session only");
    }
}
