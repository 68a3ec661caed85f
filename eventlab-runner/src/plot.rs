//! Gnuplot rendering of the three expected-CAAR curves.

use crate::stats::StudyStats;
use eventlab_core::Group;
use std::fmt::Write as _;
use std::io::Write as _;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

/// Curve order in the plot.
const PLOT_ORDER: [Group; 3] = [Group::Beat, Group::Meet, Group::Miss];

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no CAAR data for group {0}")]
    EmptySeries(Group),

    #[error("CAAR series length mismatch: {group} has {actual} points, expected {expected}")]
    LengthMismatch {
        group: Group,
        expected: usize,
        actual: usize,
    },

    #[error("failed to run gnuplot: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("gnuplot exited with {0}")]
    Exit(std::process::ExitStatus),
}

/// Build a self-contained gnuplot script with inline data blocks.
pub fn gnuplot_script(stats: &StudyStats) -> Result<String, PlotError> {
    let expected = 2 * stats.half_width;
    let mut curves = Vec::with_capacity(PLOT_ORDER.len());
    for group in PLOT_ORDER {
        let caar = stats
            .group(group)
            .map(|s| s.caar_mean.as_slice())
            .unwrap_or(&[]);
        if caar.is_empty() {
            return Err(PlotError::EmptySeries(group));
        }
        if caar.len() != expected {
            return Err(PlotError::LengthMismatch {
                group,
                expected,
                actual: caar.len(),
            });
        }
        curves.push((group, caar));
    }

    let mut script = String::new();
    script.push_str("set title 'Expected CAAR for Beat / Meet / Miss'\n");
    script.push_str("set xlabel 'Event Day (t)'\n");
    script.push_str("set ylabel 'CAAR'\n");
    script.push_str("set grid\n");
    script.push_str("set key left top\n");

    let plots: Vec<String> = curves
        .iter()
        .map(|(g, _)| format!("'-' with lines title '{g}'"))
        .collect();
    let _ = writeln!(script, "plot {}", plots.join(", "));

    let labels = stats.day_labels();
    for (_, caar) in &curves {
        for (t, v) in labels.iter().zip(caar.iter()) {
            let _ = writeln!(script, "{t} {v:.6}");
        }
        script.push_str("e\n");
    }
    Ok(script)
}

/// Pipe the script into `gnuplot -persist` and wait for it to exit.
pub fn plot_caar(stats: &StudyStats) -> Result<(), PlotError> {
    let script = gnuplot_script(stats)?;

    let mut child = Command::new("gnuplot")
        .arg("-persist")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(PlotError::Spawn)?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(script.as_bytes())
            .map_err(PlotError::Spawn)?;
    }

    let status = child.wait().map_err(PlotError::Spawn)?;
    if !status.success() {
        return Err(PlotError::Exit(status));
    }
    debug!("gnuplot finished");
    Ok(())
}
