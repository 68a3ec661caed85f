//! Price points, return arithmetic and the benchmark return table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// One daily observation: trading day and adjusted close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, adj_close: f64) -> Self {
        Self { date, adj_close }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("non-positive price {price} on {date}")]
    NonPositivePrice { date: NaiveDate, price: f64 },

    #[error("unrecognised date '{0}'")]
    BadDate(String),
}

/// Parse a trading day written as `YYYY-MM-DD` or `YYYY/M/D`.
pub fn parse_trading_day(raw: &str) -> Result<NaiveDate, SeriesError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .map_err(|_| SeriesError::BadDate(raw.to_string()))
}

/// Daily log returns `ln(p[i] / p[i-1])`; one shorter than the input.
///
/// Fails on the first non-positive price rather than producing NaN.
pub fn log_returns(prices: &[PricePoint]) -> Result<Vec<f64>, SeriesError> {
    if let Some(bad) = prices.iter().find(|p| !(p.adj_close > 0.0)) {
        return Err(SeriesError::NonPositivePrice {
            date: bad.date,
            price: bad.adj_close,
        });
    }
    Ok(prices
        .windows(2)
        .map(|w| (w[1].adj_close / w[0].adj_close).ln())
        .collect())
}

/// Running sum of a return series.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect()
}

/// Benchmark log returns keyed by trading day.
///
/// The first day of the series has no return. A day whose price or previous
/// price is non-positive is skipped, and the chain restarts from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReturns {
    returns: BTreeMap<NaiveDate, f64>,
}

impl BenchmarkReturns {
    pub fn from_prices(prices: &[PricePoint]) -> Self {
        let mut sorted: Vec<PricePoint> = prices.to_vec();
        sorted.sort_by_key(|p| p.date);
        sorted.dedup_by_key(|p| p.date);

        let mut returns = BTreeMap::new();
        for pair in sorted.windows(2) {
            let (prev, cur) = (pair[0].adj_close, pair[1].adj_close);
            if prev > 0.0 && cur > 0.0 {
                returns.insert(pair[1].date, (cur / prev).ln());
            }
        }
        Self { returns }
    }

    pub fn from_map(returns: BTreeMap<NaiveDate, f64>) -> Self {
        Self { returns }
    }

    pub fn get(&self, day: NaiveDate) -> Option<f64> {
        self.returns.get(&day).copied()
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn parses_both_date_layouts() {
        assert_eq!(parse_trading_day("2024-03-05").unwrap(), day("2024-03-05"));
        assert_eq!(parse_trading_day("2024/3/5").unwrap(), day("2024-03-05"));
        assert!(parse_trading_day("March 5").is_err());
    }

    #[test]
    fn log_returns_are_one_shorter() {
        let prices = vec![
            PricePoint::new(day("2024-01-02"), 100.0),
            PricePoint::new(day("2024-01-03"), 110.0),
            PricePoint::new(day("2024-01-04"), 99.0),
        ];
        let r = log_returns(&prices).unwrap();
        assert_eq!(r.len(), 2);
        assert!((r[0] - (1.1f64).ln()).abs() < 1e-12);
        assert!((r[1] - (0.9f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn log_returns_reject_zero_price() {
        let prices = vec![
            PricePoint::new(day("2024-01-02"), 100.0),
            PricePoint::new(day("2024-01-03"), 0.0),
        ];
        assert!(matches!(
            log_returns(&prices),
            Err(SeriesError::NonPositivePrice { .. })
        ));
    }

    #[test]
    fn cumulative_is_running_sum() {
        assert_eq!(cumulative_returns(&[0.1, -0.05, 0.02]).len(), 3);
        let c = cumulative_returns(&[1.0, 2.0, 3.0]);
        assert_eq!(c, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn benchmark_skips_first_day_and_bad_prices() {
        let prices = vec![
            PricePoint::new(day("2024-01-02"), 100.0),
            PricePoint::new(day("2024-01-03"), 0.0),
            PricePoint::new(day("2024-01-04"), 102.0),
            PricePoint::new(day("2024-01-05"), 104.0),
        ];
        let bench = BenchmarkReturns::from_prices(&prices);
        assert_eq!(bench.get(day("2024-01-02")), None);
        assert_eq!(bench.get(day("2024-01-03")), None);
        assert_eq!(bench.get(day("2024-01-04")), None);
        assert!((bench.get(day("2024-01-05")).unwrap() - (104.0f64 / 102.0).ln()).abs() < 1e-12);
        assert_eq!(bench.len(), 1);
    }
}
