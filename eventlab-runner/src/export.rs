//! Study artifacts written to the output directory.
//!
//! - `caar.csv`: one row per event day with AAR and CAAR moments per group
//! - `summary.json`: seed, N, group sizes, summary rows and batch counts
//! - `warnings.txt`: one line per pipeline warning, then one per adjusted
//!   event day

use crate::stats::{StudyStats, SummaryRow};
use crate::study::StudyResult;
use eventlab_core::{Group, Warning};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CAAR_FILE: &str = "caar.csv";
pub const SUMMARY_FILE: &str = "summary.json";
pub const WARNINGS_FILE: &str = "warnings.txt";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub caar_csv: PathBuf,
    pub summary_json: PathBuf,
    pub warnings_txt: PathBuf,
}

/// Machine-readable study summary.
#[derive(Debug, Clone, Serialize)]
pub struct StudySummary {
    pub half_width: usize,
    pub seed: u64,
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub warnings: usize,
    pub adjusted_event_days: usize,
    pub group_sizes: BTreeMap<Group, usize>,
    pub groups: BTreeMap<Group, SummaryRow>,
}

impl StudySummary {
    pub fn from_result(result: &StudyResult) -> Self {
        let group_sizes = result
            .bootstrap
            .groups
            .iter()
            .map(|(g, s)| (*g, s.stocks))
            .collect();
        let groups = result
            .stats
            .groups
            .iter()
            .map(|(g, s)| (*g, s.summary()))
            .collect();
        Self {
            half_width: result.stats.half_width,
            seed: result.bootstrap.seed,
            total_jobs: result.batch.total,
            succeeded: result.batch.succeeded,
            failed: result.batch.failed,
            warnings: result.batch.warnings.len(),
            adjusted_event_days: result.batch.adjustments.len(),
            group_sizes,
            groups,
        }
    }
}

/// CAAR table as CSV text: `t` then mean/std columns per group.
pub fn caar_csv(stats: &StudyStats) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["t".to_string()];
    for g in Group::ALL {
        for col in ["aar_mean", "aar_std", "caar_mean", "caar_std"] {
            header.push(format!("{}_{col}", g.as_str().to_lowercase()));
        }
    }
    wtr.write_record(&header)?;

    for (i, t) in stats.day_labels().iter().enumerate() {
        let mut row = vec![t.to_string()];
        for g in Group::ALL {
            let cols = stats.group(g).map(|s| {
                [&s.aar_mean, &s.aar_std, &s.caar_mean, &s.caar_std]
                    .map(|v| v.get(i).copied().unwrap_or(0.0))
            });
            for v in cols.unwrap_or([0.0; 4]) {
                row.push(format!("{v:.8}"));
            }
        }
        wtr.write_record(&row)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Failures first, then the informational event-day adjustments.
pub fn warnings_text(warnings: &[Warning], adjustments: &[Warning]) -> String {
    warnings
        .iter()
        .chain(adjustments)
        .map(|w| format!("{w}\n"))
        .collect()
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write all three artifacts under `dir`, creating it if needed.
pub fn export_study(result: &StudyResult, dir: &Path) -> Result<ExportPaths, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let paths = ExportPaths {
        caar_csv: dir.join(CAAR_FILE),
        summary_json: dir.join(SUMMARY_FILE),
        warnings_txt: dir.join(WARNINGS_FILE),
    };

    write_file(&paths.caar_csv, &caar_csv(&result.stats)?)?;
    let summary = serde_json::to_string_pretty(&StudySummary::from_result(result))?;
    write_file(&paths.summary_json, &summary)?;
    let batch = &result.batch;
    write_file(
        &paths.warnings_txt,
        &warnings_text(&batch.warnings, &batch.adjustments),
    )?;

    info!(dir = %dir.display(), "study artifacts written");
    Ok(paths)
}
