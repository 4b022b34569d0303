//! deadmap-check - run-continuity validation for ITS dead-channel maps
//!
//! Drives the external dead-map builder over a representative CTF subset
//! of one run, classifies data quality from orbit-gap statistics, and
//! finishes with a bounded-time QA macro invocation.

mod cli;
mod commands;

use std::fs;
use std::process::ExitCode;

use clap::Parser;

use cli::Cli;
use deadmap_core::config::Config;
use deadmap_core::error::ExitCode as DeadmapExitCode;
use deadmap_core::logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(e.exit_code() as u8);
        }
    };
    if let Some(root) = &cli.output_root {
        config.output_root = root.clone();
    }

    // The per-run log accumulates next to the run directory until the
    // controller relocates it to <workdir>/main.log.
    if let Err(e) = fs::create_dir_all(&config.output_root) {
        eprintln!("error: cannot create {}: {e}", config.output_root.display());
        return ExitCode::from(DeadmapExitCode::Failure as u8);
    }
    let log_file = config.output_root.join(format!("{}.log", cli.run));

    if let Err(e) = logging::init_tracing(
        cli.verbose,
        cli.log_level.as_deref(),
        cli.log_json,
        Some(&log_file),
    ) {
        // If tracing initialization fails, fall back to stderr
        eprintln!("Warning: Failed to initialize logging: {e}");
    }

    tracing::info!(run = cli.run, qa_only = cli.qa_only, "starting deadmap-check");

    match commands::run(&cli, config, log_file) {
        Ok(()) => ExitCode::from(DeadmapExitCode::Success as u8),
        Err(e) => {
            if !cli.quiet {
                eprintln!("error: {e}");
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
