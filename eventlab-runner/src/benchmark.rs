//! Benchmark preparation: fetch the index once, derive the trading calendar
//! and daily log returns from it.

use crate::config::BenchmarkConfig;
use eventlab_core::{BenchmarkReturns, DataError, PricePoint, PriceProvider, TradingCalendar};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("failed to fetch benchmark {ticker}: {source}")]
    Fetch {
        ticker: String,
        #[source]
        source: DataError,
    },

    #[error("benchmark {ticker} returned no prices between {from} and {to}")]
    Empty {
        ticker: String,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkData {
    pub ticker: String,
    pub prices: Vec<PricePoint>,
    pub calendar: TradingCalendar,
    pub returns: BenchmarkReturns,
}

impl BenchmarkData {
    pub fn from_prices(ticker: impl Into<String>, prices: Vec<PricePoint>) -> Self {
        let calendar = TradingCalendar::from_prices(&prices);
        let returns = BenchmarkReturns::from_prices(&prices);
        Self {
            ticker: ticker.into(),
            prices,
            calendar,
            returns,
        }
    }
}

pub fn prepare_benchmark(
    provider: &dyn PriceProvider,
    config: &BenchmarkConfig,
) -> Result<BenchmarkData, BenchmarkError> {
    let prices = provider
        .fetch(&config.ticker, config.from, config.to)
        .map_err(|source| BenchmarkError::Fetch {
            ticker: config.ticker.clone(),
            source,
        })?;

    if prices.is_empty() {
        return Err(BenchmarkError::Empty {
            ticker: config.ticker.clone(),
            from: config.from,
            to: config.to,
        });
    }

    let data = BenchmarkData::from_prices(&config.ticker, prices);
    info!(
        ticker = %data.ticker,
        trading_days = data.calendar.len(),
        returns = data.returns.len(),
        "benchmark prepared"
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Fixed(Vec<PricePoint>);

    impl PriceProvider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch(
            &self,
            _ticker: &str,
            _from: NaiveDate,
            _to: NaiveDate,
        ) -> Result<Vec<PricePoint>, DataError> {
            Ok(self.0.clone())
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn calendar_and_returns_come_from_prices() {
        let provider = Fixed(vec![
            PricePoint::new(day(2), 100.0),
            PricePoint::new(day(3), 101.0),
            PricePoint::new(day(4), 99.0),
        ]);
        let data = prepare_benchmark(&provider, &BenchmarkConfig::default()).unwrap();
        assert_eq!(data.calendar.len(), 3);
        assert_eq!(data.returns.len(), 2);
        assert!(data.returns.get(day(2)).is_none());
        assert!((data.returns.get(day(3)).unwrap() - (1.01f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn empty_benchmark_is_an_error() {
        let err = prepare_benchmark(&Fixed(Vec::new()), &BenchmarkConfig::default()).unwrap_err();
        assert!(matches!(err, BenchmarkError::Empty { .. }));
    }
}
