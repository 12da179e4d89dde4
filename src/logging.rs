// src/logging.rs

//! Logging setup for `rascal` using `tracing` + `tracing-subscriber`.
//!
//! `--log-level` sets one level for everything. Without it, `RASCAL_LOG`
//! is read as an `EnvFilter` directive string (`info`,
//! `rascal::scheduler=debug,warn`, ...), falling back to `info`.
//!
//! Logs go to STDERR; the dry-run report is the only thing on stdout.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "RASCAL_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(cli_level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>) -> EnvFilter {
    match cli_level {
        Some(level) => EnvFilter::new(directive(level)),
        None => EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_becomes_global_directive() {
        assert_eq!(build_filter(Some(LogLevel::Debug)).to_string(), "debug");
        assert_eq!(build_filter(Some(LogLevel::Error)).to_string(), "error");
    }
}
