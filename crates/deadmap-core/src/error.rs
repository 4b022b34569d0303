//! Error types and exit codes for deadmap-check
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure (I/O, external command plumbing)
//! - 2: Usage error (bad flags/args)
//! - 3: Run-data error (bad metadata, unusable CTF listing, empty orbit series, ...)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes reported by the deadmap-check binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Run-data error - the run cannot be meaningfully processed (3)
    RunData = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur while processing a run
#[derive(Error, Debug)]
pub enum DeadmapError {
    // Usage errors (exit code 2)
    #[error("{0}")]
    UsageError(String),

    // Run-data errors (exit code 3): the pipeline must terminate, no retry
    #[error("bookkeeping metadata unusable: {reason}")]
    Metadata { reason: String },

    #[error("CTF listing too short to process: {found} chunks (need at least 3)")]
    InsufficientData { found: usize },

    #[error("no EPN identifier in CTF reference: {line}")]
    PatternExtraction { line: String },

    #[error("unsupported detector configuration: {detectors}")]
    UnsupportedConfiguration { detectors: String },

    #[error("workflow output contains no orbit markers")]
    NoOrbitData,

    #[error("run directory not found for QA rerun: {}", .path.display())]
    MissingRunDirectory { path: PathBuf },

    // Generic failures (exit code 1)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to {operation}: {reason}")]
    FailedOperation { operation: String, reason: String },

    #[error("{0}")]
    Other(String),
}

impl DeadmapError {
    /// Create a metadata error with a formatted reason
    pub fn metadata(reason: impl std::fmt::Display) -> Self {
        DeadmapError::Metadata {
            reason: reason.to_string(),
        }
    }

    /// Create an error for a failed operation on an external collaborator
    pub fn failed(operation: &str, reason: impl std::fmt::Display) -> Self {
        DeadmapError::FailedOperation {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            DeadmapError::UsageError(_) => ExitCode::Usage,

            DeadmapError::Metadata { .. }
            | DeadmapError::InsufficientData { .. }
            | DeadmapError::PatternExtraction { .. }
            | DeadmapError::UnsupportedConfiguration { .. }
            | DeadmapError::NoOrbitData
            | DeadmapError::MissingRunDirectory { .. } => ExitCode::RunData,

            DeadmapError::Io(_)
            | DeadmapError::Json(_)
            | DeadmapError::Toml(_)
            | DeadmapError::FailedOperation { .. }
            | DeadmapError::Other(_) => ExitCode::Failure,
        }
    }
}

/// Result type alias for deadmap operations
pub type Result<T> = std::result::Result<T, DeadmapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_run_conditions_map_to_run_data_code() {
        let errors = [
            DeadmapError::metadata("empty response"),
            DeadmapError::InsufficientData { found: 2 },
            DeadmapError::PatternExtraction {
                line: "/alice/data/x".into(),
            },
            DeadmapError::UnsupportedConfiguration {
                detectors: "MFT only".into(),
            },
            DeadmapError::NoOrbitData,
            DeadmapError::MissingRunDirectory {
                path: PathBuf::from("./output/1"),
            },
        ];
        for err in errors {
            assert_eq!(err.exit_code(), ExitCode::RunData);
        }
    }

    #[test]
    fn plumbing_failures_map_to_generic_code() {
        let err = DeadmapError::failed("run alien_find", "no such file");
        assert_eq!(err.exit_code(), ExitCode::Failure);
        assert_eq!(
            err.to_string(),
            "failed to run alien_find: no such file"
        );
    }

    #[test]
    fn usage_errors_map_to_usage_code() {
        let err = DeadmapError::UsageError("run number must be positive".into());
        assert_eq!(err.exit_code(), ExitCode::Usage);
    }
}
