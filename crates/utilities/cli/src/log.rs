//! Logging arguments and the global tracing subscriber.

use crate::{CliError, CliResult};
use clap::{ArgAction, Args};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Logging arguments.
#[derive(Args, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Raises the log level: `-v` for debug, `-vv` for trace. `RUST_LOG` takes precedence.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,
}

impl LogArgs {
    /// The level selected by the verbosity flags.
    pub const fn level(&self) -> LevelFilter {
        level_for(self.verbosity)
    }
}

const fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global `fmt` subscriber.
///
/// Without an explicit `filter`, `RUST_LOG` directives apply on top of the level selected by
/// `verbosity`.
pub fn init_tracing_subscriber(
    verbosity: u8,
    filter: Option<impl Into<EnvFilter>>,
) -> CliResult<()> {
    let filter = filter.map_or_else(
        || {
            EnvFilter::builder()
                .with_default_directive(level_for(verbosity).into())
                .from_env_lossy()
        },
        Into::into,
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|err| CliError::TracingInitialization(err.to_string()))
}
