//! CLI argument definitions for proxysync-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Keeps a reverse-proxy container attached to every Docker network it should serve.
///
/// Runs one reconciliation at startup, then re-runs it on every matching
/// network event until interrupted or the failure budget is exhausted.
#[derive(Parser, Debug)]
#[command(name = "proxysync-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to proxysync.toml configuration file.
    ///
    /// Without it, built-in defaults plus `PROXYSYNC_*` environment variables are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration and exit without connecting to Docker.
    #[arg(long)]
    pub validate: bool,

    /// Run a single reconciliation cycle and exit.
    #[arg(long)]
    pub once: bool,
}
