//! Run context shared by the pipeline stages
//!
//! Built once by the controller after metadata resolution and passed by
//! reference everywhere else; nothing mutates it afterwards.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct RunContext {
    /// Run number
    pub run: u32,
    /// LHC period token, e.g. "LHC24af"
    pub period: String,
    /// Data-taking year derived from the period token
    pub year: u16,
    /// Nominal run duration in seconds, from bookkeeping
    pub duration_secs: f64,
    /// ITS participated in the run
    pub has_its: bool,
    /// MFT participated in the run
    pub has_mft: bool,
    /// Working directory owned by this run
    pub workdir: PathBuf,
}
