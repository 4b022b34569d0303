//! The run-continuity check command

use std::path::PathBuf;

use crate::cli::Cli;
use deadmap_core::config::Config;
use deadmap_core::error::Result;
use deadmap_core::pipeline::Pipeline;

pub fn handle_check(cli: &Cli, config: Config, log_file: PathBuf) -> Result<()> {
    let pipeline = Pipeline::new(config, cli.run, log_file);
    pipeline.execute(cli.qa_only)
}
