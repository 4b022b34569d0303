//! CLI argument parsing for deadmap-check

use clap::Parser;
use std::path::PathBuf;

/// Validate the time-continuity of one run's dead-channel maps
#[derive(Parser, Debug)]
#[command(name = "deadmap-check")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run number to process
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub run: u32,

    /// Re-run only the QA stage against an existing run directory
    #[arg(long)]
    pub qa_only: bool,

    /// Base directory for per-run output
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    /// Verbose logging (debug level)
    #[arg(long, short)]
    pub verbose: bool,

    /// Explicit log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit structured JSON logs on stderr
    #[arg(long)]
    pub log_json: bool,
}
