//! Tracing setup for the CLI.
//!
//! Diagnostics go to stderr so stdout stays clean for rendered reports
//! and JSON output. `REWEAVE_LOG` overrides the verbosity flags with a
//! full filter directive.

use tracing::metadata::LevelFilter;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "REWEAVE_LOG";

/// Install the global subscriber. `verbosity` counts `-v` flags;
/// `quiet` wins and drops everything below errors.
pub fn init(verbosity: u8, quiet: bool) {
    let default_level = if quiet {
        LevelFilter::ERROR
    } else {
        level_from_verbosity(verbosity)
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
