//! Logging setup.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Map the `-v` count to the crates' log level.
#[must_use]
pub const fn level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Default filter directives when `RUST_LOG` is unset.
#[must_use]
pub fn default_directives(verbosity: u8) -> String {
    let level = level(verbosity);
    format!(
        "newscast={level},newscast_cli={level},{}",
        if verbosity >= 2 { "debug" } else { "warn" }
    )
}

/// Initialize the global subscriber. `RUST_LOG` takes precedence over `verbosity`.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}
