//! QA macro invocation with a bounded wall-clock
//!
//! The ROOT macro inspects the produced dead-channel map and writes its own
//! verdict log. Unlike the main workflow it runs under a hard deadline: on
//! expiry the child is killed and the QA directory removed, so no partial
//! QA output ever survives. Every failure in this phase is advisory; the
//! pipeline reaches a terminal state regardless.

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};
use wait_timeout::ChildExt;

use crate::error::Result;

/// QA output directory inside the run directory
pub const QA_DIR: &str = "ITSQA";

/// Backup location for the previous QA output on rerun
pub const QA_BACKUP_DIR: &str = "ITSQA_backup";

/// Combined stdout/stderr capture of the QA process
pub const QA_COMBINED_LOG: &str = "root.log";

/// Verdict log written by the QA macro itself
pub const QA_MACRO_LOG: &str = "DeadMapQA.log";

/// Dead-channel map artifact the QA macro inspects
pub const MAP_FILE: &str = "its_time_deadmap.root";

/// Classification of the QA macro's own log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaOutcome {
    Ok,
    HasWarning,
    HasError,
}

/// Closed set of expected QA-phase failures
#[derive(Error, Debug)]
pub enum QaError {
    #[error("failed to spawn QA process: {0}")]
    Spawn(String),

    #[error("QA process exceeded {0} s timeout")]
    Timeout(u64),

    #[error("expected QA output missing: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("unexpected QA failure: {0}")]
    Unexpected(String),
}

/// On a QA-only rerun, rotate any pre-existing QA output aside so the new
/// invocation starts clean without destroying the latest prior result.
pub fn backup_previous(workdir: &Path) -> Result<()> {
    let qa_dir = workdir.join(QA_DIR);
    if !qa_dir.is_dir() {
        return Ok(());
    }
    let backup = workdir.join(QA_BACKUP_DIR);
    if backup.is_dir() {
        fs::remove_dir_all(&backup)?;
    }
    info!(
        from = %qa_dir.display(),
        to = %backup.display(),
        "moving previous QA output to backup"
    );
    fs::rename(&qa_dir, &backup)?;
    Ok(())
}

/// Run the QA macro against the run's map artifact.
///
/// Never fatal: on any failure the QA directory is removed and `None`
/// returned, with the cause logged.
pub fn run(workdir: &Path, run: u32, macro_path: &Path, timeout_secs: u64) -> Option<QaOutcome> {
    info!(timeout_secs, "running QA macro on the map object");
    match try_run(workdir, run, macro_path, timeout_secs) {
        Ok(outcome) => Some(outcome),
        Err(err) => {
            error!(%err, "QA did not complete; removing QA directory");
            let qa_dir = workdir.join(QA_DIR);
            if qa_dir.exists() {
                if let Err(e) = fs::remove_dir_all(&qa_dir) {
                    warn!(error = %e, "could not remove QA directory");
                }
            }
            None
        }
    }
}

fn try_run(
    workdir: &Path,
    run: u32,
    macro_path: &Path,
    timeout_secs: u64,
) -> std::result::Result<QaOutcome, QaError> {
    let qa_dir = workdir.join(QA_DIR);
    fs::create_dir_all(&qa_dir).map_err(|e| QaError::Unexpected(e.to_string()))?;

    let map_file = workdir.join(MAP_FILE);
    let macro_call = format!(
        "{}(\"{}\",{},\"{}/\")",
        macro_path.display(),
        map_file.display(),
        run,
        qa_dir.display()
    );

    let stdout_path = qa_dir.join("qa_stdout.tmp");
    let stderr_path = qa_dir.join("qa_stderr.tmp");
    let stdout_file =
        File::create(&stdout_path).map_err(|e| QaError::Unexpected(e.to_string()))?;
    let stderr_file =
        File::create(&stderr_path).map_err(|e| QaError::Unexpected(e.to_string()))?;

    let mut child = Command::new("root")
        .arg("-b")
        .arg(&macro_call)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .map_err(|e| QaError::Spawn(e.to_string()))?;

    let status = wait_bounded(&mut child, timeout_secs)?;
    if !status.success() {
        warn!(code = ?status.code(), "QA process exited non-zero");
    }

    compose_combined_log(&qa_dir, &stdout_path, &stderr_path)?;

    let macro_log = qa_dir.join(QA_MACRO_LOG);
    let text = fs::read_to_string(&macro_log).map_err(|_| QaError::MissingOutput(macro_log))?;
    Ok(classify_log(&text))
}

/// Wait for the child under a deadline; on expiry kill it and report a
/// timeout.
fn wait_bounded(child: &mut Child, timeout_secs: u64) -> std::result::Result<ExitStatus, QaError> {
    match child
        .wait_timeout(Duration::from_secs(timeout_secs))
        .map_err(|e| QaError::Unexpected(e.to_string()))?
    {
        Some(status) => Ok(status),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(QaError::Timeout(timeout_secs))
        }
    }
}

fn compose_combined_log(
    qa_dir: &Path,
    stdout_path: &Path,
    stderr_path: &Path,
) -> std::result::Result<(), QaError> {
    let stdout_text = fs::read_to_string(stdout_path).unwrap_or_default();
    let stderr_text = fs::read_to_string(stderr_path).unwrap_or_default();

    let mut log = File::create(qa_dir.join(QA_COMBINED_LOG))
        .map_err(|e| QaError::Unexpected(e.to_string()))?;
    write!(
        log,
        "========\n stderr \n========\n{stderr_text}========\n stdout \n========\n{stdout_text}"
    )
    .map_err(|e| QaError::Unexpected(e.to_string()))?;

    let _ = fs::remove_file(stdout_path);
    let _ = fs::remove_file(stderr_path);
    Ok(())
}

/// Scan the QA macro's log for severity markers.
///
/// Three independent case-sensitive passes; each category is reported at
/// most once, on its first occurrence.
pub fn classify_log(text: &str) -> QaOutcome {
    let fatal = text.lines().find(|line| line.contains("FATAL"));
    let errored = text.lines().find(|line| line.contains("ERROR"));
    let warned = text.lines().find(|line| line.contains("WARNING"));

    if let Some(line) = fatal {
        error!(line = %line, "FATAL in the object QA");
    }
    if let Some(line) = errored {
        error!(line = %line, "there are errors in the object QA");
    }
    if let Some(line) = warned {
        warn!(line = %line, "there are warnings in the object QA");
    }

    if fatal.is_some() || errored.is_some() {
        QaOutcome::HasError
    } else if warned.is_some() {
        QaOutcome::HasWarning
    } else {
        QaOutcome::Ok
    }
}
