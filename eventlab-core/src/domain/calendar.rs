//! Trading calendar derived from the benchmark series.

use super::series::PricePoint;
use chrono::NaiveDate;

/// Ascending, deduplicated trading days.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradingCalendar {
    days: Vec<NaiveDate>,
}

impl TradingCalendar {
    /// Build from arbitrary days; input order and duplicates do not matter.
    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut days: Vec<NaiveDate> = days.into_iter().collect();
        days.sort_unstable();
        days.dedup();
        Self { days }
    }

    /// Build from the dates of a (benchmark) price series.
    pub fn from_prices(prices: &[PricePoint]) -> Self {
        Self::from_days(prices.iter().map(|p| p.date))
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<NaiveDate> {
        self.days.get(index).copied()
    }

    pub fn first(&self) -> Option<NaiveDate> {
        self.days.first().copied()
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.days.last().copied()
    }

    /// `Ok(index)` if `day` is a trading day, otherwise `Err(insertion point)`.
    pub fn search(&self, day: NaiveDate) -> Result<usize, usize> {
        self.days.binary_search(&day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_and_dedups() {
        let d = |n| NaiveDate::from_ymd_opt(2024, 1, n).unwrap();
        let cal = TradingCalendar::from_days(vec![d(5), d(2), d(3), d(2)]);
        assert_eq!(cal.days(), &[d(2), d(3), d(5)]);
        assert_eq!(cal.search(d(3)), Ok(1));
        assert_eq!(cal.search(d(4)), Err(2));
    }
}
