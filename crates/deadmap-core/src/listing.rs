//! Raw CTF listing retrieval
//!
//! Delegates to the grid file-listing executable and persists its output in
//! the run directory. Only the textual listing is consumed here; chunk
//! parsing and subset selection live in [`crate::chunks`].

use std::fs;
use std::process::Command;

use tracing::info;

use crate::context::RunContext;
use crate::error::{DeadmapError, Result};

/// Full raw listing, one CTF per line
pub const LISTING_FILE: &str = "full_ctf_list.dat";

/// List every CTF of the run and persist the listing as
/// `full_ctf_list.dat` in the working directory.
pub fn fetch_listing(ctx: &RunContext) -> Result<Vec<String>> {
    let raw_dir = format!(
        "/alice/data/{}/{}/{}/raw/",
        ctx.year, ctx.period, ctx.run
    );
    info!(path = %raw_dir, "listing CTFs");

    let output = Command::new("alien_find")
        .arg(&raw_dir)
        .arg("o2_ctf*")
        .output()
        .map_err(|e| DeadmapError::failed("run alien_find", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DeadmapError::failed(
            "list CTFs",
            format!("alien_find exited with {}: {}", output.status, stderr.trim()),
        ));
    }

    let text = String::from_utf8_lossy(&output.stdout).to_string();
    fs::write(ctx.workdir.join(LISTING_FILE), &text)?;

    let lines: Vec<String> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(String::from)
        .collect();
    info!(count = lines.len(), "CTF listing complete");
    Ok(lines)
}
