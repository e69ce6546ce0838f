// jumplinks/src/logger.rs
//! Logger bootstrap for the `jumplinks` binary.
//!
//! `RUST_LOG` governs by default (falling back to `warn`); an explicit level
//! passed in by the CLI flags overrides it.

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Initialises `env_logger` on stderr. Safe to call more than once.
pub fn init_logger(level: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = level {
        builder.filter_level(level);
    }
    builder.format_timestamp(None).target(Target::Stderr);

    // A second init (tests, embedding) is not an error worth surfacing.
    let _ = builder.try_init();
}

/// Maps the `--debug` / `--quiet` flags to an override level.
pub fn level_from_flags(debug: bool, quiet: bool) -> Option<LevelFilter> {
    if quiet {
        Some(LevelFilter::Off)
    } else if debug {
        Some(LevelFilter::Debug)
    } else {
        None
    }
}
