//! Offline provider reading `<dir>/<TICKER>.csv` files in EOD CSV layout.
//!
//! Useful when the API is unavailable and for reproducible runs.

use super::eodhd::parse_eod_csv;
use super::provider::{DataError, PriceProvider};
use crate::domain::PricePoint;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CsvDirProvider {
    dir: PathBuf,
}

impl CsvDirProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

impl PriceProvider for CsvDirProvider {
    fn name(&self) -> &str {
        "csv_dir"
    }

    fn fetch(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, DataError> {
        let path = self.path_for(ticker);
        let text = std::fs::read_to_string(&path).map_err(|source| DataError::Io {
            path: path.clone(),
            source,
        })?;
        let mut points = parse_eod_csv(&text)?;
        points.retain(|p| p.date >= from && p.date <= to);
        Ok(points)
    }
}
