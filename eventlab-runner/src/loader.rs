//! Earnings and sector CSV loading.
//!
//! Earnings columns: `ticker, date, period_ending, estimate, reported,
//! surprise, surprise%`. Sector columns: `ticker, company name, sector`.
//! The first line of both files is a header.

use eventlab_core::domain::parse_trading_day;
use eventlab_core::{EarningsInfo, StockRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no earnings records could be loaded from {0}")]
    NoRecords(PathBuf),
}

/// Records keyed by ticker plus the number of rows that failed to parse.
#[derive(Debug, Clone, Default)]
pub struct EarningsLoad {
    pub records: BTreeMap<String, StockRecord>,
    pub skipped: usize,
}

fn open(path: &Path) -> Result<File, LoadError> {
    File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Numbers may carry a trailing `%`.
fn parse_number(field: Option<&str>) -> Option<f64> {
    field?.trim_end_matches('%').trim().parse().ok()
}

fn parse_earnings_row(row: &csv::StringRecord) -> Option<(String, EarningsInfo)> {
    let announcement = parse_trading_day(row.get(1)?).ok()?;
    let info = EarningsInfo {
        announcement,
        period_ending: row.get(2).unwrap_or_default().to_string(),
        estimate: parse_number(row.get(3))?,
        reported: parse_number(row.get(4))?,
        surprise: parse_number(row.get(5))?,
        surprise_pct: parse_number(row.get(6))?,
    };
    Some((row.get(0)?.to_string(), info))
}

/// Parse an earnings CSV. Rows without a ticker or date are ignored; rows
/// with an unreadable date or number are counted in `skipped`. A later row
/// for the same ticker replaces an earlier one.
pub fn read_earnings<R: Read>(reader: R) -> Result<EarningsLoad, csv::Error> {
    let mut load = EarningsLoad::default();
    for row in csv_reader(reader).records() {
        let row = row?;
        let ticker = row.get(0).unwrap_or_default();
        let date = row.get(1).unwrap_or_default();
        if ticker.is_empty() || date.is_empty() {
            continue;
        }
        match parse_earnings_row(&row) {
            Some((ticker, info)) => {
                load.records
                    .insert(ticker.clone(), StockRecord::new(ticker, info));
            }
            None => load.skipped += 1,
        }
    }
    Ok(load)
}

pub fn load_earnings(path: &Path) -> Result<EarningsLoad, LoadError> {
    let load = read_earnings(open(path)?).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    if load.records.is_empty() {
        return Err(LoadError::NoRecords(path.to_path_buf()));
    }
    info!(
        loaded = load.records.len(),
        skipped = load.skipped,
        path = %path.display(),
        "loaded earnings"
    );
    Ok(load)
}

/// Attach company name and sector to tickers already in `records`.
/// Returns how many records were enriched.
pub fn apply_sectors<R: Read>(
    records: &mut BTreeMap<String, StockRecord>,
    reader: R,
) -> Result<usize, csv::Error> {
    let mut enriched = 0;
    for row in csv_reader(reader).records() {
        let row = row?;
        let Some(record) = row.get(0).and_then(|t| records.get_mut(t)) else {
            continue;
        };
        let non_empty = |i: usize| {
            row.get(i)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        record.company_name = non_empty(1);
        record.sector = non_empty(2);
        enriched += 1;
    }
    Ok(enriched)
}

pub fn load_sectors(
    path: &Path,
    records: &mut BTreeMap<String, StockRecord>,
) -> Result<usize, LoadError> {
    let enriched = apply_sectors(records, open(path)?).map_err(|source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    info!(enriched, path = %path.display(), "applied sector data");
    Ok(enriched)
}
