//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;
use tank_core::Endpoint;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "tank", version, about = "Liquid tank level monitor")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/tank_config.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Measure continuously at the stored measurement interval
    Run {
        /// Stop after this many ticks (default: until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Do not wait out the measurement interval between ticks
        #[arg(long, action = ArgAction::SetTrue)]
        no_wait: bool,
    },
    /// Print the stored settings and how they loaded
    Show,
    /// Record the current smoothed distance as the empty or full endpoint
    Calibrate {
        /// Which endpoint to record: empty | full
        #[arg(value_name = "ENDPOINT")]
        endpoint: Endpoint,
        /// Ticks to take first so the smoothing buffer settles
        #[arg(long, value_name = "N", default_value_t = 5)]
        ticks: u64,
    },
    /// Apply a batch of settings, e.g. `set tankHeight=120 alertLevelLow=15`
    Set {
        /// key=value pairs using the settings names
        #[arg(value_name = "KEY=VALUE", required = true)]
        pairs: Vec<String>,
    },
    /// Quick health check: one tick must produce a valid echo
    SelfCheck,
}
