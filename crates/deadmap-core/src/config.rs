//! Pipeline configuration
//!
//! Built from defaults, an optional TOML file, and `DEADMAP_*` environment
//! overrides, in that order. Everything here points at external
//! collaborators (bookkeeping service, credential file, QA macro) or tunes
//! timeouts; the analysis policy itself is fixed.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

/// Default bookkeeping service base URL
pub const DEFAULT_BOOKKEEPING_URL: &str = "https://ali-bookkeeping.cern.ch";

/// Default timeout for the bookkeeping HTTP query
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// QA macro timeout on a fresh run
pub const DEFAULT_QA_TIMEOUT_SECS: u64 = 60;

/// QA macro timeout on a QA-only rerun
pub const DEFAULT_QA_RERUN_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the bookkeeping service
    pub bookkeeping_url: String,
    /// File holding the bookkeeping bearer token
    pub token_file: PathBuf,
    /// Base directory for per-run output
    pub output_root: PathBuf,
    /// Path to the QA ROOT macro
    pub qa_macro: PathBuf,
    /// Timeout for the bookkeeping HTTP query, in seconds
    pub http_timeout_secs: u64,
    /// QA macro timeout on a fresh run, in seconds
    pub qa_timeout_secs: u64,
    /// QA macro timeout on a QA-only rerun, in seconds
    pub qa_rerun_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bookkeeping_url: DEFAULT_BOOKKEEPING_URL.to_string(),
            token_file: PathBuf::from("./.bookkeeping-token"),
            output_root: PathBuf::from("./output"),
            qa_macro: PathBuf::from("DeadMapQA.C"),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            qa_timeout_secs: DEFAULT_QA_TIMEOUT_SECS,
            qa_rerun_timeout_secs: DEFAULT_QA_RERUN_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from an optional TOML file, then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => toml::from_str(&fs::read_to_string(p)?)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("DEADMAP_BOOKKEEPING_URL") {
            if !url.is_empty() {
                self.bookkeeping_url = url;
            }
        }

        if let Ok(path) = env::var("DEADMAP_TOKEN_FILE") {
            if !path.is_empty() {
                self.token_file = PathBuf::from(path);
            }
        }

        if let Ok(path) = env::var("DEADMAP_OUTPUT_ROOT") {
            if !path.is_empty() {
                self.output_root = PathBuf::from(path);
            }
        }

        if let Ok(path) = env::var("DEADMAP_QA_MACRO") {
            if !path.is_empty() {
                self.qa_macro = PathBuf::from(path);
            }
        }

        if let Ok(timeout) = env::var("DEADMAP_QA_TIMEOUT") {
            if let Ok(secs) = timeout.parse::<u64>() {
                self.qa_timeout_secs = secs.clamp(5, 600);
            }
        }
    }

    /// Working directory for a run
    pub fn workdir(&self, run: u32) -> PathBuf {
        self.output_root.join(run.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.bookkeeping_url, DEFAULT_BOOKKEEPING_URL);
        assert_eq!(config.qa_timeout_secs, DEFAULT_QA_TIMEOUT_SECS);
        assert_eq!(config.qa_rerun_timeout_secs, DEFAULT_QA_RERUN_TIMEOUT_SECS);
        assert_eq!(config.workdir(123456), PathBuf::from("./output/123456"));
    }

    #[test]
    fn test_config_from_toml() {
        let config: Config = toml::from_str(
            r#"
            bookkeeping_url = "http://localhost:4000"
            token_file = "/etc/deadmap/token"
            qa_timeout_secs = 90
            "#,
        )
        .unwrap();
        assert_eq!(config.bookkeeping_url, "http://localhost:4000");
        assert_eq!(config.token_file, PathBuf::from("/etc/deadmap/token"));
        assert_eq!(config.qa_timeout_secs, 90);
        // untouched fields keep their defaults
        assert_eq!(config.output_root, PathBuf::from("./output"));
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let result = toml::from_str::<Config>("bookeeping_url = \"typo\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_config_qa_timeout_env_clamping() {
        std::env::set_var("DEADMAP_QA_TIMEOUT", "1");
        let mut config = Config::default();
        config.apply_env();
        assert_eq!(config.qa_timeout_secs, 5);
        std::env::remove_var("DEADMAP_QA_TIMEOUT");
    }
}
