//! Bookkeeping metadata resolution
//!
//! One synchronous query against the bookkeeping HTTP API, authenticated
//! with a bearer token read from a local credential file. Anything short of
//! exactly one well-formed run record is fatal: the pipeline cannot decide
//! detector participation or nominal duration without it.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::error::{DeadmapError, Result};

/// Snapshot of the raw bookkeeping response, kept for auditability
pub const SNAPSHOT_FILE: &str = "run.json";

/// Metadata extracted from the bookkeeping record for one run
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub period: String,
    pub year: u16,
    pub duration_secs: f64,
    pub has_its: bool,
    pub has_mft: bool,
}

#[derive(Deserialize)]
struct RunsResponse {
    data: Vec<RunRecord>,
}

#[derive(Deserialize)]
struct RunRecord {
    #[serde(rename = "lhcPeriod")]
    lhc_period: String,
    detectors: String,
    #[serde(rename = "runDuration")]
    run_duration: DurationMs,
}

/// The bookkeeping API has served `runDuration` both as a JSON number and
/// as a string across versions; accept either.
#[derive(Deserialize)]
#[serde(untagged)]
enum DurationMs {
    Millis(u64),
    Text(String),
}

impl DurationMs {
    fn as_secs(&self) -> Result<f64> {
        match self {
            DurationMs::Millis(ms) => Ok(*ms as f64 / 1000.0),
            DurationMs::Text(s) => s
                .trim()
                .parse::<u64>()
                .map(|ms| ms as f64 / 1000.0)
                .map_err(|e| DeadmapError::metadata(format!("runDuration not numeric: {e}"))),
        }
    }
}

/// Resolve run metadata from the bookkeeping service.
///
/// Side effect: if `workdir` already exists, the raw response body is
/// persisted there as `run.json`.
pub fn resolve(run: u32, config: &Config, workdir: &Path) -> Result<RunMetadata> {
    let token = read_token(&config.token_file)?;

    info!(run, "querying bookkeeping");
    let url = format!(
        "{}/api/runs?filter[runNumbers]={}&page[offset]=0",
        config.bookkeeping_url.trim_end_matches('/'),
        run
    );
    let body = fetch(&url, &token, Duration::from_secs(config.http_timeout_secs))?;

    if workdir.is_dir() {
        fs::write(workdir.join(SNAPSHOT_FILE), &body)?;
    }

    let metadata = parse_response(&body)?;
    info!(
        period = %metadata.period,
        duration_secs = metadata.duration_secs,
        its = metadata.has_its,
        mft = metadata.has_mft,
        "bookkeeping record resolved"
    );
    Ok(metadata)
}

fn read_token(path: &Path) -> Result<String> {
    let token = fs::read_to_string(path)
        .map_err(|e| {
            DeadmapError::metadata(format!("cannot read bookkeeping token {}: {e}", path.display()))
        })?
        .trim()
        .to_string();
    if token.is_empty() {
        return Err(DeadmapError::metadata(format!(
            "bookkeeping token file {} is empty",
            path.display()
        )));
    }
    Ok(token)
}

fn fetch(url: &str, token: &str, timeout: Duration) -> Result<String> {
    let response = ureq::get(url)
        .set("Authorization", &format!("Bearer {token}"))
        .set("Accept", "application/json")
        .timeout(timeout)
        .call();

    match response {
        Ok(res) => res
            .into_string()
            .map_err(|e| DeadmapError::metadata(format!("unreadable response body: {e}"))),
        Err(ureq::Error::Status(code, _)) => Err(DeadmapError::metadata(format!(
            "bookkeeping returned HTTP {code}"
        ))),
        Err(ureq::Error::Transport(e)) => {
            Err(DeadmapError::metadata(format!("transport error: {e}")))
        }
    }
}

/// Extract the single-run metadata from a raw bookkeeping response body.
pub fn parse_response(body: &str) -> Result<RunMetadata> {
    let parsed: RunsResponse = serde_json::from_str(body)
        .map_err(|e| DeadmapError::metadata(format!("malformed bookkeeping response: {e}")))?;

    let record = match parsed.data.as_slice() {
        [record] => record,
        other => {
            return Err(DeadmapError::metadata(format!(
                "expected exactly one run record, got {}",
                other.len()
            )))
        }
    };

    let detectors: Vec<&str> = record.detectors.split(',').map(str::trim).collect();
    Ok(RunMetadata {
        period: record.lhc_period.clone(),
        year: year_from_period(&record.lhc_period)?,
        duration_secs: record.run_duration.as_secs()?,
        has_its: detectors.contains(&"ITS"),
        has_mft: detectors.contains(&"MFT"),
    })
}

/// Derive the data-taking year from a period token, e.g. "LHC24af" -> 2024.
pub fn year_from_period(period: &str) -> Result<u16> {
    let digits = period.get(3..5).ok_or_else(|| {
        DeadmapError::metadata(format!("period token too short for a year: {period:?}"))
    })?;
    format!("20{digits}")
        .parse::<u16>()
        .map_err(|_| DeadmapError::metadata(format!("period token has no year digits: {period:?}")))
}
