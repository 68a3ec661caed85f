//! Bootstrap resampling of abnormal returns per group.
//!
//! Each resample draws `min(sample_size, group size)` stocks with
//! replacement, averages their abnormal returns day by day (AAR) and takes
//! the running sum (CAAR). Groups run in parallel; each gets its own RNG
//! seeded from the master seed through BLAKE3, so results do not depend on
//! thread scheduling.

use crate::config::BootstrapConfig;
use eventlab_core::domain::cumulative_returns;
use eventlab_core::{Group, StockRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

// ─── Result types ────────────────────────────────────────────────────

/// Resampled AAR and CAAR paths for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSamples {
    pub group: Group,
    /// Stocks eligible for drawing (complete abnormal-return series).
    pub stocks: usize,
    pub aar: Vec<Vec<f64>>,
    pub caar: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    pub seed: u64,
    pub half_width: usize,
    pub groups: BTreeMap<Group, GroupSamples>,
}

// ─── Seeding ─────────────────────────────────────────────────────────

/// Per-group seed, independent of the order groups are processed in.
pub fn sub_seed(master_seed: u64, group: Group) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&master_seed.to_le_bytes());
    hasher.update(group.as_str().as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

// ─── Resampling ──────────────────────────────────────────────────────

/// Abnormal-return series of length `2 * half_width`, bucketed by group.
pub fn eligible_series(
    records: &[StockRecord],
    half_width: usize,
) -> BTreeMap<Group, Vec<&[f64]>> {
    let expected = 2 * half_width;
    let mut by_group: BTreeMap<Group, Vec<&[f64]>> =
        Group::ALL.iter().map(|g| (*g, Vec::new())).collect();
    for record in records {
        let Some(group) = record.group else { continue };
        let ar = record.abnormal_returns();
        if ar.len() == expected && expected > 0 {
            by_group.entry(group).or_default().push(ar);
        }
    }
    by_group
}

/// One resample: mean of `draws` randomly chosen series, then running sum.
fn resample<R: Rng>(series: &[&[f64]], draws: usize, len: usize, rng: &mut R) -> (Vec<f64>, Vec<f64>) {
    let mut aar = vec![0.0; len];
    for _ in 0..draws {
        let pick = series[rng.gen_range(0..series.len())];
        for (acc, x) in aar.iter_mut().zip(pick) {
            *acc += x;
        }
    }
    let scale = draws as f64;
    aar.iter_mut().for_each(|x| *x /= scale);

    let caar = cumulative_returns(&aar);
    (aar, caar)
}

/// Bootstrap one group. An empty group yields no samples.
pub fn bootstrap_group<R: Rng>(
    group: Group,
    series: &[&[f64]],
    len: usize,
    config: &BootstrapConfig,
    rng: &mut R,
) -> GroupSamples {
    let mut out = GroupSamples {
        group,
        stocks: series.len(),
        aar: Vec::with_capacity(config.samples),
        caar: Vec::with_capacity(config.samples),
    };
    if series.is_empty() || config.sample_size == 0 {
        warn!(group = %group, "no eligible stocks, skipping bootstrap");
        return out;
    }

    let draws = config.sample_size.min(series.len());
    for _ in 0..config.samples {
        let (aar, caar) = resample(series, draws, len, rng);
        out.aar.push(aar);
        out.caar.push(caar);
    }
    out
}

/// Bootstrap all three groups in parallel.
pub fn run_bootstrap(
    records: &[StockRecord],
    half_width: usize,
    config: &BootstrapConfig,
    master_seed: u64,
) -> BootstrapResult {
    let eligible = eligible_series(records, half_width);
    let len = 2 * half_width;

    let groups: BTreeMap<Group, GroupSamples> = Group::ALL
        .par_iter()
        .map(|group| {
            let series = eligible.get(group).map(Vec::as_slice).unwrap_or_default();
            let mut rng = StdRng::seed_from_u64(sub_seed(master_seed, *group));
            (*group, bootstrap_group(*group, series, len, config, &mut rng))
        })
        .collect();

    for samples in groups.values() {
        info!(
            group = %samples.group,
            stocks = samples.stocks,
            samples = samples.aar.len(),
            "bootstrap complete"
        );
    }

    BootstrapResult {
        seed: master_seed,
        half_width,
        groups,
    }
}
