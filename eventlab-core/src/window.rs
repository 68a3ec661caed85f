//! Event-window resolution against the trading calendar.
//!
//! An announcement that falls on a non-trading day is moved to the previous
//! trading day. The window then needs exactly `N` trading days strictly before
//! and `N` strictly after the (adjusted) event day, giving `2N + 1` prices and
//! `2N` returns. That count is checked again when fetched series come back.

use crate::domain::{TradingCalendar, WindowBounds};
use chrono::NaiveDate;
use thiserror::Error;

/// A resolved window of `2N + 1` trading days centred on the event day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventWindow {
    pub requested_day: NaiveDate,
    pub event_day: NaiveDate,
    /// Position of `event_day` in the calendar it was resolved against.
    pub event_index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub half_width: usize,
    /// Set when the requested day was not a trading day.
    pub note: Option<String>,
}

impl EventWindow {
    pub fn expected_prices(&self) -> usize {
        2 * self.half_width + 1
    }

    pub fn expected_returns(&self) -> usize {
        2 * self.half_width
    }

    pub fn was_adjusted(&self) -> bool {
        self.requested_day != self.event_day
    }

    pub fn bounds(&self) -> WindowBounds {
        WindowBounds {
            start: self.start,
            event_day: self.event_day,
            end: self.end,
        }
    }

    /// Trading days carrying a return: event day `-N + 1` through `+N`.
    pub fn return_days<'a>(&self, calendar: &'a TradingCalendar) -> &'a [NaiveDate] {
        let from = self.event_index + 1 - self.half_width;
        let to = self.event_index + self.half_width;
        &calendar.days()[from..=to]
    }
}

/// How far short of the required trading days one side of the window is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub needed: usize,
    pub available: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("no trading day before {requested}")]
    NoTradingDayBefore { requested: NaiveDate },

    #[error("{}", coverage_message(.event_day, .note.as_deref(), .before, .after))]
    InsufficientCoverage {
        event_day: NaiveDate,
        note: Option<String>,
        before: Option<Shortfall>,
        after: Option<Shortfall>,
    },
}

fn coverage_message(
    event_day: &NaiveDate,
    note: Option<&str>,
    before: &Option<Shortfall>,
    after: &Option<Shortfall>,
) -> String {
    let mut parts = Vec::new();
    if let Some(note) = note {
        parts.push(note.to_string());
    }
    if let Some(s) = before {
        parts.push(format!(
            "insufficient days before, needed {}, only {}",
            s.needed, s.available
        ));
    }
    if let Some(s) = after {
        parts.push(format!(
            "insufficient days after, needed {}, only {}",
            s.needed, s.available
        ));
    }
    format!("event day {event_day}: {}", parts.join("; "))
}

/// Resolve the `2N + 1` day window around `requested_day`.
pub fn resolve(
    calendar: &TradingCalendar,
    requested_day: NaiveDate,
    half_width: usize,
) -> Result<EventWindow, WindowError> {
    let (event_index, note) = match calendar.search(requested_day) {
        Ok(idx) => (idx, None),
        Err(0) => {
            return Err(WindowError::NoTradingDayBefore {
                requested: requested_day,
            })
        }
        Err(insert_at) => {
            let idx = insert_at - 1;
            let adjusted = calendar.days()[idx];
            let note = format!(
                "adjusted event day: {requested_day} -> {adjusted} (previous trading day)"
            );
            (idx, Some(note))
        }
    };
    let event_day = calendar.days()[event_index];

    let days_before = event_index;
    let days_after = calendar.len() - event_index - 1;

    let before = (days_before < half_width).then_some(Shortfall {
        needed: half_width,
        available: days_before,
    });
    let after = (days_after < half_width).then_some(Shortfall {
        needed: half_width,
        available: days_after,
    });

    if before.is_some() || after.is_some() {
        return Err(WindowError::InsufficientCoverage {
            event_day,
            note,
            before,
            after,
        });
    }

    Ok(EventWindow {
        requested_day,
        event_day,
        event_index,
        start: calendar.days()[event_index - half_width],
        end: calendar.days()[event_index + half_width],
        half_width,
        note,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ten consecutive weekdays starting Monday 2024-01-08.
    fn ten_day_calendar() -> TradingCalendar {
        let start = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let days = (0..14)
            .map(|i| start + chrono::Duration::days(i))
            .filter(|d| chrono::Datelike::weekday(d).num_days_from_monday() < 5);
        TradingCalendar::from_days(days)
    }

    #[test]
    fn exact_trading_day_resolves() {
        let cal = ten_day_calendar();
        assert_eq!(cal.len(), 10);
        let w = resolve(&cal, cal.days()[4], 3).unwrap();
        assert_eq!(w.event_index, 4);
        assert_eq!(w.start, cal.days()[1]);
        assert_eq!(w.end, cal.days()[7]);
        assert_eq!(w.expected_prices(), 7);
        assert_eq!(w.expected_returns(), 6);
        assert!(w.note.is_none());
        assert_eq!(w.return_days(&cal), &cal.days()[2..=7]);
    }

    #[test]
    fn weekend_announcement_moves_to_friday() {
        let cal = ten_day_calendar();
        let saturday = NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
        let w = resolve(&cal, saturday, 2).unwrap();
        assert_eq!(w.event_day, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
        assert!(w.was_adjusted());
        assert!(w.note.as_deref().unwrap().contains("previous trading day"));
    }

    #[test]
    fn too_close_to_start_reports_days_before() {
        let cal = ten_day_calendar();
        let err = resolve(&cal, cal.days()[2], 3).unwrap_err();
        match &err {
            WindowError::InsufficientCoverage { before, after, .. } => {
                assert_eq!(
                    *before,
                    Some(Shortfall {
                        needed: 3,
                        available: 2
                    })
                );
                assert!(after.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err
            .to_string()
            .contains("insufficient days before, needed 3, only 2"));
    }

    #[test]
    fn both_sides_short_are_both_reported() {
        let cal = ten_day_calendar();
        let msg = resolve(&cal, cal.days()[5], 6).unwrap_err().to_string();
        assert!(msg.contains("insufficient days before, needed 6, only 5"));
        assert!(msg.contains("insufficient days after, needed 6, only 4"));
    }

    #[test]
    fn day_before_calendar_has_no_trading_day() {
        let cal = ten_day_calendar();
        let early = NaiveDate::from_ymd_opt(2023, 12, 29).unwrap();
        assert_eq!(
            resolve(&cal, early, 1),
            Err(WindowError::NoTradingDayBefore { requested: early })
        );
    }

    #[test]
    fn day_after_calendar_adjusts_to_last_day() {
        let cal = ten_day_calendar();
        let late = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let err = resolve(&cal, late, 1).unwrap_err();
        assert!(err.to_string().contains("insufficient days after, needed 1, only 0"));
        assert!(err.to_string().contains("adjusted event day"));
    }

    #[test]
    fn empty_calendar_has_no_trading_day() {
        let cal = TradingCalendar::default();
        let day = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert!(matches!(
            resolve(&cal, day, 0),
            Err(WindowError::NoTradingDayBefore { .. })
        ));
    }
}
