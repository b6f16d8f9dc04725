//! CLI argument definitions for soctide-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Soctide security log monitoring daemon.
///
/// Orchestrates the ingestion engine, the analysis pipeline, and the
/// governance layer, and manages their lifecycles.
#[derive(Parser, Debug)]
#[command(name = "soctide-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to soctide.toml configuration file.
    #[arg(short, long, default_value = "/etc/soctide/soctide.toml")]
    pub config: PathBuf,

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

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}
