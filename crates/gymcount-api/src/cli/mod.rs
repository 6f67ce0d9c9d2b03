//! CLI command definitions for the `gymcount` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use gymcount_infra::config::DEFAULT_CONFIG_FILE;

/// Gym presence counter: MQTT door sensors in, live occupancy out.
#[derive(Parser)]
#[command(name = "gymcount", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP gateway and the MQTT listener.
    Serve {
        /// Path to the TOML config file.
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Socket address to bind (overrides config and GYMCOUNT_BIND).
        #[arg(long)]
        bind: Option<String>,

        /// Directory with the dashboard's static files.
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Print the resolved configuration with secrets redacted.
    Config {
        /// Path to the TOML config file.
        #[arg(long, short, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
