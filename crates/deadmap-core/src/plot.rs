//! Gap-vs-step plot
//!
//! Persisted for operator inspection only; no later decision reads it.
//! Emitted as a self-contained SVG so the artifact needs no plotting
//! toolchain to produce or view.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Plot artifact file name inside the run directory
pub const PLOT_FILE: &str = "orbits.svg";

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 480.0;
const MARGIN: f64 = 60.0;

/// Write the gap-vs-step chart for a run's orbit series.
pub fn write_gap_plot(path: &Path, gaps: &[i64]) -> Result<()> {
    let x0 = MARGIN;
    let y0 = HEIGHT - MARGIN;
    let x1 = WIDTH - MARGIN;
    let y1 = MARGIN;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{WIDTH}\" height=\"{HEIGHT}\" \
         viewBox=\"0 0 {WIDTH} {HEIGHT}\">\n"
    ));
    svg.push_str("<rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x1}\" y2=\"{y0}\" stroke=\"black\"/>\n"
    ));
    svg.push_str(&format!(
        "<line x1=\"{x0}\" y1=\"{y0}\" x2=\"{x0}\" y2=\"{y1}\" stroke=\"black\"/>\n"
    ));

    if !gaps.is_empty() {
        let max_gap = gaps.iter().copied().max().unwrap_or(0).max(1) as f64;
        let steps = (gaps.len() - 1).max(1) as f64;

        let mut points = String::new();
        for (i, &gap) in gaps.iter().enumerate() {
            let x = x0 + (i as f64 / steps) * (x1 - x0);
            let y = y0 - (gap as f64 / max_gap) * (y0 - y1);
            points.push_str(&format!("{x:.1},{y:.1} "));
        }
        svg.push_str(&format!(
            "<polyline points=\"{}\" fill=\"none\" stroke=\"red\" stroke-width=\"1.5\"/>\n",
            points.trim_end()
        ));
        for point in points.split_whitespace() {
            if let Some((x, y)) = point.split_once(',') {
                svg.push_str(&format!(
                    "<circle cx=\"{x}\" cy=\"{y}\" r=\"2.5\" fill=\"red\"/>\n"
                ));
            }
        }
        svg.push_str(&format!(
            "<text x=\"{x0}\" y=\"{}\" font-size=\"13\">max gap: {} orbits</text>\n",
            y1 - 10.0,
            max_gap as i64
        ));
        svg.push_str(&format!(
            "<text x=\"{}\" y=\"{}\" font-size=\"13\" text-anchor=\"end\">{} steps</text>\n",
            x1,
            y0 + 30.0,
            gaps.len()
        ));
    }

    svg.push_str("</svg>\n");
    fs::write(path, svg)?;
    Ok(())
}
