//! Orbit continuity analysis
//!
//! The workflow logs one marker per processed timeframe with the first
//! orbit it covers. A continuous run produces an evenly spaced orbit
//! series; holes in the series mean the dead-channel map has blind
//! intervals. Severity is classified from the largest gap.

use std::fmt;

use regex::Regex;
use tracing::{error, info, warn};

use crate::error::{DeadmapError, Result};
use crate::workflow::WorkflowResult;

/// Fundamental timing unit of the detector
pub const ORBIT_PERIOD_SECS: f64 = 89e-6;

/// Largest tolerable gap before the run is flagged ERROR, in orbits
pub const GAP_ERROR_THRESHOLD: i64 = 320_000;

/// Largest tolerable gap before the run is flagged WARNING, in orbits
pub const GAP_WARNING_THRESHOLD: i64 = 32_000;

/// Relative tolerance between covered orbit range and nominal run duration
const DURATION_TOLERANCE: f64 = 0.05;

/// Marker phrase the builder logs once per received timeframe
const MARKER_PHRASE: &str = "TF received. First orbit";

/// Device tag scoping the marker to the ITS builder
const BUILDER_TAG: &str = "deadmap-builder_its";

/// Continuity classification for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Gap statistics over the sorted orbit series
#[derive(Debug, Clone)]
pub struct GapStatistics {
    /// Consecutive differences of the sorted series
    pub gaps: Vec<i64>,
    pub max: i64,
    pub min: i64,
    /// Population standard deviation of the gaps
    pub std_dev: f64,
    /// Orbit range covered by the map, in seconds
    pub covered_secs: f64,
}

/// Full analyzer output: statistics, classification and advisory flags
#[derive(Debug, Clone)]
pub struct ContinuityReport {
    pub orbits: Vec<i64>,
    pub stats: GapStatistics,
    pub severity: Severity,
    pub stderr_nonempty: bool,
    pub stdout_has_error: bool,
    pub duration_deviates: bool,
}

/// Extract the sorted orbit series from the workflow stdout.
///
/// An empty series means the workflow produced no usable output; the
/// parsing grammar is fixed, so that condition is fatal rather than a
/// silent miscount.
pub fn extract_orbits(stdout: &[String]) -> Result<Vec<i64>> {
    let re = Regex::new(r"First orbit ([0-9]+)")
        .map_err(|e| DeadmapError::Other(format!("invalid orbit pattern: {e}")))?;

    let mut orbits = Vec::new();
    for line in stdout {
        if !line.contains(MARKER_PHRASE) || !line.contains(BUILDER_TAG) {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            match caps[1].parse::<i64>() {
                Ok(orbit) => orbits.push(orbit),
                Err(_) => warn!(line = %line, "orbit marker out of range, skipping"),
            }
        }
    }

    if orbits.is_empty() {
        return Err(DeadmapError::NoOrbitData);
    }
    orbits.sort_unstable();
    Ok(orbits)
}

/// Compute gap statistics over a sorted orbit series.
pub fn gap_statistics(orbits: &[i64]) -> GapStatistics {
    let gaps: Vec<i64> = orbits.windows(2).map(|w| w[1] - w[0]).collect();
    let covered = match (orbits.first(), orbits.last()) {
        (Some(first), Some(last)) => (last - first) as f64 * ORBIT_PERIOD_SECS,
        _ => 0.0,
    };
    GapStatistics {
        max: gaps.iter().copied().max().unwrap_or(0),
        min: gaps.iter().copied().min().unwrap_or(0),
        std_dev: population_std_dev(&gaps),
        covered_secs: covered,
        gaps,
    }
}

/// Classify continuity from the largest gap.
pub fn classify(max_gap: i64) -> Severity {
    if max_gap > GAP_ERROR_THRESHOLD {
        Severity::Error
    } else if max_gap > GAP_WARNING_THRESHOLD {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Analyze a workflow result against the nominal run duration.
pub fn analyze(result: &WorkflowResult, nominal_secs: f64) -> Result<ContinuityReport> {
    let stderr_nonempty = result.stderr.iter().any(|line| !line.trim().is_empty());
    if stderr_nonempty {
        error!("there are errors in the workflow stderr");
    }

    let orbits = extract_orbits(&result.stdout)?;

    let stdout_has_error = result
        .stdout
        .iter()
        .any(|line| line.to_lowercase().contains("error"));
    if stdout_has_error {
        error!("there are errors in the workflow stdout");
    }

    let stats = gap_statistics(&orbits);
    info!(
        timeframes = orbits.len(),
        first = orbits.first().copied().unwrap_or(0),
        last = orbits.last().copied().unwrap_or(0),
        covered_min = stats.covered_secs / 60.0,
        "orbit range reconstructed"
    );

    let duration_deviates = nominal_secs > 0.0
        && ((stats.covered_secs - nominal_secs).abs() / nominal_secs) > DURATION_TOLERANCE;
    if duration_deviates {
        error!(
            covered_secs = stats.covered_secs,
            nominal_secs,
            "big difference between map range and run duration"
        );
    }

    let severity = classify(stats.max);
    log_gap_statistics(severity, &stats);

    Ok(ContinuityReport {
        orbits,
        stats,
        severity,
        stderr_nonempty,
        stdout_has_error,
        duration_deviates,
    })
}

fn log_gap_statistics(severity: Severity, stats: &GapStatistics) {
    match severity {
        Severity::Info => info!(
            max_gap = stats.max,
            min_gap = stats.min,
            std_dev = stats.std_dev,
            "orbit gaps within tolerance"
        ),
        Severity::Warning => warn!(
            max_gap = stats.max,
            min_gap = stats.min,
            std_dev = stats.std_dev,
            "orbit gap above warning threshold"
        ),
        Severity::Error => error!(
            max_gap = stats.max,
            min_gap = stats.min,
            std_dev = stats.std_dev,
            "orbit gap above error threshold"
        ),
    }
}

fn population_std_dev(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<i64>() as f64 / n;
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / n;
    variance.sqrt()
}
