//! Command handling for deadmap-check

mod check;

use std::path::PathBuf;

use crate::cli::Cli;
use deadmap_core::config::Config;
use deadmap_core::error::Result;

pub fn run(cli: &Cli, config: Config, log_file: PathBuf) -> Result<()> {
    check::handle_check(cli, config, log_file)
}
