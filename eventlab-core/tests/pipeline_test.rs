//! End-to-end batches against stub providers: throttling, per-ticker
//! failure isolation and repeatability.

use chrono::{Datelike, NaiveDate};
use eventlab_core::data::DataError;
use eventlab_core::domain::EarningsInfo;
use eventlab_core::pipeline::{ProgressSink, ProgressSnapshot};
use eventlab_core::{
    BenchmarkReturns, Job, Pipeline, PipelineConfig, PriceProvider, PricePoint, RateLimiter,
    SharedStore, Stage, StockRecord, TradingCalendar,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Forty weekdays starting Monday 2024-01-01.
fn calendar() -> Arc<TradingCalendar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let days = (0..56)
        .map(|i| start + chrono::Duration::days(i))
        .filter(|d| d.weekday().num_days_from_monday() < 5);
    Arc::new(TradingCalendar::from_days(days))
}

fn benchmark(calendar: &TradingCalendar) -> Arc<BenchmarkReturns> {
    let prices: Vec<PricePoint> = calendar
        .days()
        .iter()
        .enumerate()
        .map(|(i, d)| PricePoint::new(*d, 400.0 + i as f64 * 0.25))
        .collect();
    Arc::new(BenchmarkReturns::from_prices(&prices))
}

fn record(ticker: &str, announcement: NaiveDate) -> StockRecord {
    StockRecord::new(
        ticker,
        EarningsInfo {
            announcement,
            period_ending: "2023-12-31".into(),
            estimate: 1.0,
            reported: 1.2,
            surprise: 0.2,
            surprise_pct: 20.0,
        },
    )
}

#[derive(Default)]
struct StubProvider {
    calendar: Arc<TradingCalendar>,
    latency: Duration,
    short: HashSet<String>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl StubProvider {
    fn new(calendar: Arc<TradingCalendar>) -> Self {
        Self {
            calendar,
            ..Default::default()
        }
    }

    fn call_count(&self, ticker: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == ticker)
            .count()
    }

    fn call_times(&self) -> Vec<Instant> {
        let mut times: Vec<Instant> = self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect();
        times.sort();
        times
    }
}

impl PriceProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    fn fetch(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, DataError> {
        self.calls
            .lock()
            .unwrap()
            .push((ticker.to_string(), Instant::now()));
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }
        if self.failing.contains(ticker) {
            return Err(DataError::RetriesExhausted {
                ticker: ticker.to_string(),
                attempts: 5,
                last: "HTTP 503".into(),
            });
        }
        if self.panicking.contains(ticker) {
            panic!("stub exploded on {ticker}");
        }

        let offset = ticker.bytes().map(f64::from).sum::<f64>() % 17.0;
        let mut points: Vec<PricePoint> = self
            .calendar
            .days()
            .iter()
            .filter(|d| **d >= from && **d <= to)
            .enumerate()
            .map(|(i, d)| PricePoint::new(*d, 50.0 + offset + (i as f64 * 0.37).sin()))
            .collect();
        if self.short.contains(ticker) {
            points.pop();
        }
        Ok(points)
    }
}

fn config(half_width: usize, workers: usize, qps: u32) -> PipelineConfig {
    PipelineConfig {
        half_width,
        workers,
        max_calls_per_second: qps,
    }
}

#[test]
fn throttled_batch_respects_capacity_and_latency() {
    let cal = calendar();
    let mut stub = StubProvider::new(Arc::clone(&cal));
    stub.latency = Duration::from_millis(300);
    let stub = Arc::new(stub);

    let tickers = ["AAA", "BBB", "CCC", "DDD", "EEE"];
    let store = Arc::new(SharedStore::from_records(
        tickers.iter().map(|t| record(t, cal.days()[20])),
    ));
    let limiter = Arc::new(RateLimiter::new(2));
    let pipeline = Pipeline::new(stub.clone(), config(3, 2, 2)).with_limiter(limiter);

    let start = Instant::now();
    let report = pipeline
        .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.total, 5);
    assert_eq!(report.succeeded, 5);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert!(elapsed >= Duration::from_millis(900));
    // Five permits at two per second need a third window.
    assert!(elapsed >= Duration::from_millis(1990), "{elapsed:?}");

    // Lazy window resets allow at most two calls in any sub-second span.
    let times = stub.call_times();
    assert_eq!(times.len(), 5);
    for from in &times {
        let in_span = times
            .iter()
            .filter(|t| **t >= *from && t.duration_since(*from) < Duration::from_millis(900))
            .count();
        assert!(in_span <= 2, "{in_span} calls within 900ms");
    }
}

#[test]
fn short_series_leaves_record_untouched_with_one_warning() {
    let cal = calendar();
    let mut stub = StubProvider::new(Arc::clone(&cal));
    stub.short.insert("X".into());
    let stub = Arc::new(stub);

    let store = Arc::new(SharedStore::from_records([
        record("X", cal.days()[15]),
        record("Y", cal.days()[15]),
    ]));
    let before = store.get("X").unwrap();

    let report = Pipeline::new(stub, config(3, 2, 0))
        .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();

    assert_eq!(store.get("X").unwrap(), before);
    assert!(store.get("Y").unwrap().has_prices());

    let x_warnings: Vec<_> = report.warnings_for("X").collect();
    assert_eq!(x_warnings.len(), 1);
    assert_eq!(x_warnings[0].stage, Stage::Alignment);
    assert!(x_warnings[0].message.contains("expected 7 points, got 6"));
    assert_eq!(report.warnings.len(), 1);
    assert_eq!((report.succeeded, report.failed), (1, 1));
}

#[test]
fn committed_record_has_full_series() {
    let cal = calendar();
    let stub = Arc::new(StubProvider::new(Arc::clone(&cal)));
    let store = Arc::new(SharedStore::from_records([record("MSFT", cal.days()[12])]));

    Pipeline::new(stub, config(4, 1, 0))
        .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();

    let event = store.get("MSFT").unwrap().event.unwrap();
    assert_eq!(event.prices.len(), 9);
    assert_eq!(event.returns.len(), 8);
    assert_eq!(event.cumulative_returns.len(), 8);
    assert_eq!(event.abnormal_returns.len(), 8);
    assert_eq!(event.window.event_day, cal.days()[12]);
    assert_eq!(event.window.start, cal.days()[8]);
    assert_eq!(event.window.end, cal.days()[16]);
}

#[test]
fn window_failure_skips_the_fetch() {
    let cal = calendar();
    let stub = Arc::new(StubProvider::new(Arc::clone(&cal)));
    let store = Arc::new(SharedStore::from_records([
        record("EARLY", cal.days()[2]),
        record("OK", cal.days()[10]),
    ]));

    let report = Pipeline::new(stub.clone(), config(3, 2, 0))
        .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();

    assert_eq!(stub.call_count("EARLY"), 0);
    assert_eq!(stub.call_count("OK"), 1);
    let w: Vec<_> = report.warnings_for("EARLY").collect();
    assert_eq!(w.len(), 1);
    assert_eq!(w[0].stage, Stage::Window);
    assert!(w[0].message.contains("insufficient days before, needed 3, only 2"));
}

#[test]
fn weekend_announcement_uses_previous_trading_day() {
    let cal = calendar();
    let stub = Arc::new(StubProvider::new(Arc::clone(&cal)));
    let saturday = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
    let store = Arc::new(SharedStore::from_records([record("WKND", saturday)]));

    let report = Pipeline::new(stub, config(3, 1, 0))
        .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert!(report.warnings.is_empty());
    let event = store.get("WKND").unwrap().event.unwrap();
    assert_eq!(event.window.event_day, NaiveDate::from_ymd_opt(2024, 1, 19).unwrap());

    let note = "adjusted event day: 2024-01-20 -> 2024-01-19 (previous trading day)";
    assert_eq!(event.adjustment_note.as_deref(), Some(note));
    assert_eq!(report.adjustments.len(), 1);
    assert_eq!(report.adjustments[0].ticker, "WKND");
    assert_eq!(report.adjustments[0].stage, Stage::Window);
    assert_eq!(report.adjustments[0].message, note);
}

#[test]
fn trading_day_announcement_has_no_adjustment() {
    let cal = calendar();
    let stub = Arc::new(StubProvider::new(Arc::clone(&cal)));
    let store = Arc::new(SharedStore::from_records([record("WKDY", cal.days()[12])]));

    let report = Pipeline::new(stub, config(3, 1, 0))
        .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();

    assert!(report.adjustments.is_empty());
    assert!(store.get("WKDY").unwrap().event.unwrap().adjustment_note.is_none());
}

/// Records every per-job snapshot the pipeline reports.
#[derive(Default)]
struct RecordingSink {
    done: Mutex<Vec<(String, usize)>>,
}

impl ProgressSink for RecordingSink {
    fn on_job_done(&self, ticker: &str, snapshot: &ProgressSnapshot) {
        self.done
            .lock()
            .unwrap()
            .push((ticker.to_string(), snapshot.done));
    }
}

#[test]
fn panicking_job_still_reaches_progress_sink() {
    let cal = calendar();
    let mut stub = StubProvider::new(Arc::clone(&cal));
    stub.panicking.insert("BOOM".into());
    let store = Arc::new(SharedStore::from_records([
        record("BOOM", cal.days()[10]),
        record("GOOD", cal.days()[10]),
    ]));
    let sink = Arc::new(RecordingSink::default());

    let report = Pipeline::new(Arc::new(stub), config(3, 2, 0))
        .with_progress(sink.clone())
        .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();

    assert_eq!(report.failed, 1);
    let done = sink.done.lock().unwrap();
    assert_eq!(done.len(), 2);
    assert!(done.iter().any(|(t, _)| t == "BOOM"));
    assert_eq!(done.iter().map(|(_, n)| *n).max(), Some(2));
}

#[test]
fn failures_are_isolated_per_ticker() {
    let cal = calendar();
    let mut stub = StubProvider::new(Arc::clone(&cal));
    stub.failing.insert("DOWN".into());
    stub.panicking.insert("BOOM".into());
    let stub = Arc::new(stub);

    let store = Arc::new(SharedStore::from_records([
        record("DOWN", cal.days()[10]),
        record("BOOM", cal.days()[10]),
        record("GOOD", cal.days()[10]),
    ]));
    let mut jobs = store.jobs();
    jobs.push(Job::new("GHOST", cal.days()[10]));

    let report = Pipeline::new(stub, config(3, 3, 0))
        .run(jobs, Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
        .unwrap();

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 3);

    let stage_of = |t: &str| report.warnings_for(t).next().map(|w| w.stage);
    assert_eq!(stage_of("DOWN"), Some(Stage::Fetch));
    assert_eq!(stage_of("BOOM"), Some(Stage::Task));
    assert_eq!(stage_of("GHOST"), Some(Stage::Commit));
    assert_eq!(stage_of("GOOD"), None);

    assert!(!store.contains("GHOST"));
    assert!(store.get("GOOD").unwrap().has_prices());
}

#[test]
fn repeated_runs_produce_identical_store() {
    let cal = calendar();
    let run_once = || {
        let mut stub = StubProvider::new(Arc::clone(&cal));
        stub.short.insert("S".into());
        let store = Arc::new(SharedStore::from_records(
            ["A", "B", "C", "D", "S"]
                .iter()
                .enumerate()
                .map(|(i, t)| record(t, cal.days()[5 + i * 4])),
        ));
        let report = Pipeline::new(Arc::new(stub), config(3, 4, 0))
            .run(store.jobs(), Arc::clone(&cal), benchmark(&cal), Arc::clone(&store))
            .unwrap();
        (store.digest().unwrap(), report.warnings.len())
    };

    let first = run_once();
    let second = run_once();
    assert_eq!(first, second);
    assert_eq!(first.1, 1);
}
