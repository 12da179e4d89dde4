// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `rascal`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rascal",
    version,
    about = "Decompose automation routines and schedule them onto per-device queues.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = "Rascal.toml")]
    pub config: String,

    /// Exit as soon as every configured routine has finished.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RASCAL_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the decomposition, but don't dispatch
    /// anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
