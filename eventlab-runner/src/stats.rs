//! Cross-sample statistics over the bootstrap paths.
//!
//! For each group and event day: mean and sample standard deviation of AAR
//! and CAAR across the resamples. Standard deviations use the `n - 1`
//! denominator and are zero with fewer than two samples.

use crate::bootstrap::{BootstrapResult, GroupSamples};
use eventlab_core::Group;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub samples: usize,
    pub aar_mean: Vec<f64>,
    pub aar_std: Vec<f64>,
    pub caar_mean: Vec<f64>,
    pub caar_std: Vec<f64>,
}

/// One line of the group summary table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub avg_aar_mean: f64,
    pub avg_aar_std: f64,
    pub final_caar_mean: f64,
    pub final_caar_std: f64,
}

impl GroupStats {
    pub fn from_samples(samples: &GroupSamples, len: usize) -> Self {
        let (aar_mean, aar_std) = column_moments(&samples.aar, len);
        let (caar_mean, caar_std) = column_moments(&samples.caar, len);
        Self {
            samples: samples.aar.len(),
            aar_mean,
            aar_std,
            caar_mean,
            caar_std,
        }
    }

    pub fn summary(&self) -> SummaryRow {
        SummaryRow {
            avg_aar_mean: average(&self.aar_mean),
            avg_aar_std: average(&self.aar_std),
            final_caar_mean: self.caar_mean.last().copied().unwrap_or(0.0),
            final_caar_std: self.caar_std.last().copied().unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyStats {
    pub half_width: usize,
    pub groups: BTreeMap<Group, GroupStats>,
}

impl StudyStats {
    pub fn from_bootstrap(result: &BootstrapResult) -> Self {
        let len = 2 * result.half_width;
        let groups = Group::ALL
            .iter()
            .map(|g| {
                let stats = result
                    .groups
                    .get(g)
                    .map(|s| GroupStats::from_samples(s, len))
                    .unwrap_or_else(|| GroupStats::from_samples(&empty(*g), len));
                (*g, stats)
            })
            .collect();
        Self {
            half_width: result.half_width,
            groups,
        }
    }

    pub fn group(&self, group: Group) -> Option<&GroupStats> {
        self.groups.get(&group)
    }

    /// Event-day labels for the `2N` return positions.
    pub fn day_labels(&self) -> Vec<i64> {
        day_labels(self.half_width)
    }
}

/// `-N + 1 ..= N`.
pub fn day_labels(half_width: usize) -> Vec<i64> {
    let n = half_width as i64;
    (-n + 1..=n).collect()
}

/// `-N ..= N`: event-day offsets of the `2N + 1` window prices.
pub fn price_labels(half_width: usize) -> Vec<i64> {
    let n = half_width as i64;
    (-n..=n).collect()
}

fn empty(group: Group) -> GroupSamples {
    GroupSamples {
        group,
        stocks: 0,
        aar: Vec::new(),
        caar: Vec::new(),
    }
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Per-column mean and sample std over `rows`, each of width `len`.
fn column_moments(rows: &[Vec<f64>], len: usize) -> (Vec<f64>, Vec<f64>) {
    let n = rows.len();
    let mut mean = vec![0.0; len];
    let mut std = vec![0.0; len];
    if n == 0 {
        return (mean, std);
    }

    for row in rows {
        for (m, x) in mean.iter_mut().zip(row) {
            *m += x;
        }
    }
    mean.iter_mut().for_each(|m| *m /= n as f64);

    if n > 1 {
        for row in rows {
            for ((s, x), m) in std.iter_mut().zip(row).zip(&mean) {
                *s += (x - m).powi(2);
            }
        }
        std.iter_mut()
            .for_each(|s| *s = (*s / (n - 1) as f64).sqrt());
    }
    (mean, std)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(aar: Vec<Vec<f64>>) -> GroupSamples {
        let caar = aar
            .iter()
            .map(|row| eventlab_core::domain::cumulative_returns(row))
            .collect();
        GroupSamples {
            group: Group::Beat,
            stocks: 3,
            aar,
            caar,
        }
    }

    #[test]
    fn labels_run_from_one_minus_n_to_n() {
        assert_eq!(day_labels(3), vec![-2, -1, 0, 1, 2, 3]);
        assert!(day_labels(0).is_empty());
        assert_eq!(price_labels(2), vec![-2, -1, 0, 1, 2]);
    }

    #[test]
    fn mean_and_sample_std() {
        let s = samples(vec![vec![1.0, 2.0], vec![3.0, 6.0]]);
        let stats = GroupStats::from_samples(&s, 2);
        assert_eq!(stats.aar_mean, vec![2.0, 4.0]);
        assert!((stats.aar_std[0] - 2f64.sqrt()).abs() < 1e-12);
        assert!((stats.aar_std[1] - 8f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats.caar_mean, vec![2.0, 6.0]);
    }

    #[test]
    fn single_sample_has_zero_std() {
        let s = samples(vec![vec![0.5, -0.5]]);
        let stats = GroupStats::from_samples(&s, 2);
        assert_eq!(stats.aar_std, vec![0.0, 0.0]);
        assert_eq!(stats.summary().final_caar_mean, 0.0);
    }

    #[test]
    fn summary_averages_aar_and_takes_last_caar() {
        let s = samples(vec![vec![0.01, 0.03], vec![0.03, 0.01]]);
        let row = GroupStats::from_samples(&s, 2).summary();
        assert!((row.avg_aar_mean - 0.02).abs() < 1e-12);
        assert!((row.final_caar_mean - 0.04).abs() < 1e-12);
        assert!(row.final_caar_std.abs() < 1e-12);
    }

    #[test]
    fn missing_groups_are_filled_with_zeros() {
        let result = BootstrapResult {
            seed: 1,
            half_width: 2,
            groups: BTreeMap::new(),
        };
        let stats = StudyStats::from_bootstrap(&result);
        assert_eq!(stats.groups.len(), 3);
        assert_eq!(stats.group(Group::Miss).unwrap().caar_mean, vec![0.0; 4]);
    }
}
