//! Sector-neutral Miss / Meet / Beat assignment.
//!
//! Within each sector, stocks are ranked by surprise %, `ceil(trim * n)` are
//! dropped from each tail, and the rest is cut into thirds. Beat takes any
//! remainder. Stocks without a sector, in an excluded sector, or trimmed
//! away are dropped from the study.

use crate::config::GroupingConfig;
use eventlab_core::{Group, StockRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingSummary {
    pub miss: usize,
    pub meet: usize,
    pub beat: usize,
    /// Sectors that took part in grouping.
    pub sectors: usize,
    /// Records dropped for lack of a group.
    pub removed: usize,
}

impl GroupingSummary {
    pub fn total(&self) -> usize {
        self.miss + self.meet + self.beat
    }

    pub fn count(&self, group: Group) -> usize {
        match group {
            Group::Miss => self.miss,
            Group::Meet => self.meet,
            Group::Beat => self.beat,
        }
    }

    fn add(&mut self, group: Group) {
        match group {
            Group::Miss => self.miss += 1,
            Group::Meet => self.meet += 1,
            Group::Beat => self.beat += 1,
        }
    }
}

/// Groups for one sector, indexed like `ranked`, which is sorted ascending
/// by surprise %.
fn split_sector(len: usize, trim_fraction: f64) -> Vec<Option<Group>> {
    let trim = (len as f64 * trim_fraction).ceil() as usize;
    let mut groups = vec![None; len];
    if 2 * trim >= len {
        return groups;
    }

    let kept = len - 2 * trim;
    let third = kept / 3;
    for (offset, slot) in groups[trim..len - trim].iter_mut().enumerate() {
        *slot = Some(if offset < third {
            Group::Miss
        } else if offset < 2 * third {
            Group::Meet
        } else {
            Group::Beat
        });
    }
    groups
}

/// Tag every record with its group and return only the grouped ones.
pub fn assign_groups(
    records: BTreeMap<String, StockRecord>,
    config: &GroupingConfig,
) -> (BTreeMap<String, StockRecord>, GroupingSummary) {
    let total = records.len();
    let mut by_sector: BTreeMap<String, Vec<StockRecord>> = BTreeMap::new();
    for mut record in records.into_values() {
        record.group = None;
        let Some(sector) = record.sector.clone() else {
            continue;
        };
        if sector.is_empty() || config.excluded_sectors.iter().any(|s| *s == sector) {
            continue;
        }
        by_sector.entry(sector).or_default().push(record);
    }

    let mut summary = GroupingSummary {
        sectors: by_sector.len(),
        ..Default::default()
    };
    let mut grouped = BTreeMap::new();

    for mut members in by_sector.into_values() {
        members.sort_by(|a, b| {
            a.earnings
                .surprise_pct
                .total_cmp(&b.earnings.surprise_pct)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        let groups = split_sector(members.len(), config.trim_fraction);
        for (mut record, group) in members.into_iter().zip(groups) {
            if let Some(group) = group {
                record.group = Some(group);
                summary.add(group);
                grouped.insert(record.ticker.clone(), record);
            }
        }
    }

    summary.removed = total - grouped.len();
    info!(
        miss = summary.miss,
        meet = summary.meet,
        beat = summary.beat,
        sectors = summary.sectors,
        removed = summary.removed,
        "sector-neutral grouping complete"
    );
    (grouped, summary)
}
