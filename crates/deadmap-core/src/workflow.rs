//! External dead-map builder workflow invocation
//!
//! Assembles the CTF-reader / dead-map-builder shell pipeline for the run's
//! detector configuration and executes it synchronously, capturing stdout
//! and stderr to files in the working directory. The workflow is
//! long-running by design, so no timeout is enforced at this stage.

use std::fs;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::context::RunContext;
use crate::error::{DeadmapError, Result};

/// Captured workflow stdout
pub const WORKFLOW_LOG: &str = "o2-deadmapbuilder.log";

/// Captured workflow stderr
pub const WORKFLOW_ERR: &str = "o2-deadmapbuilder.err";

/// Captured output and wall-clock duration of one workflow execution
#[derive(Debug, Clone)]
pub struct WorkflowResult {
    pub stdout: Vec<String>,
    pub stderr: Vec<String>,
    pub duration: Duration,
}

/// Timeframe length in orbits, reflecting the 2023 detector
/// reconfiguration.
pub fn timeframe_length(year: u16) -> u32 {
    if year < 2023 {
        128
    } else {
        32
    }
}

/// Assemble the shell pipeline for the run's detector configuration.
///
/// Runs without ITS participation cannot be processed at all.
pub fn command_line(ctx: &RunContext, subset_path: &Path) -> Result<String> {
    let tf_length = timeframe_length(ctx.year);
    if ctx.has_its && ctx.has_mft {
        Ok(format!(
            "{} | {} | {}",
            reader_stage(subset_path, "ITS,MFT"),
            builder_stage(&ctx.workdir, tf_length, false, false),
            builder_stage(&ctx.workdir, tf_length, true, true),
        ))
    } else if ctx.has_its {
        Ok(format!(
            "{} | {}",
            reader_stage(subset_path, "ITS"),
            builder_stage(&ctx.workdir, tf_length, false, true),
        ))
    } else {
        Err(DeadmapError::UnsupportedConfiguration {
            detectors: if ctx.has_mft {
                "MFT only".to_string()
            } else {
                "neither ITS nor MFT".to_string()
            },
        })
    }
}

fn reader_stage(subset_path: &Path, detectors: &str) -> String {
    format!(
        "o2-ctf-reader-workflow -b --ctf-input {} \
         --remote-regex \"^alien:///alice/data/.+\" --copy-cmd no-copy \
         --onlyDet {} --shm-segment-size 40000000000",
        subset_path.display(),
        detectors
    )
}

fn builder_stage(workdir: &Path, tf_length: u32, mft: bool, last_stage: bool) -> String {
    let mut stage = format!(
        "o2-itsmft-deadmap-builder-workflow {}--local-output --output-dir {} \
         --source clusters {}--tf-sampling 1 --tf-length {} \
         --shm-segment-size 4000000000 -b",
        if mft { "--runmft " } else { "" },
        workdir.display(),
        if mft { "--skip-static-map " } else { "" },
        tf_length
    );
    if last_stage {
        stage.push_str(" --run");
    }
    stage
}

/// Execute the workflow, blocking until it terminates.
///
/// A non-zero exit status is advisory: the analysis stage decides from the
/// captured log whether the output is usable.
pub fn run(ctx: &RunContext, subset_path: &Path) -> Result<WorkflowResult> {
    let command = command_line(ctx, subset_path)?;
    let log_path = ctx.workdir.join(WORKFLOW_LOG);
    let err_path = ctx.workdir.join(WORKFLOW_ERR);
    info!(
        tf_length = timeframe_length(ctx.year),
        log = %log_path.display(),
        err = %err_path.display(),
        "executing workflow"
    );

    let log = File::create(&log_path)?;
    let err = File::create(&err_path)?;
    let started = Instant::now();
    let status = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(err))
        .status()
        .map_err(|e| DeadmapError::failed("spawn workflow", e))?;
    let duration = started.elapsed();

    if !status.success() {
        error!(code = ?status.code(), "workflow exited with non-zero status");
    }
    info!(
        secs = duration.as_secs_f64(),
        min = duration.as_secs_f64() / 60.0,
        "workflow finished"
    );

    Ok(WorkflowResult {
        stdout: read_lines(&log_path)?,
        stderr: read_lines(&err_path)?,
        duration,
    })
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    Ok(fs::read_to_string(path)?
        .lines()
        .map(String::from)
        .collect())
}
