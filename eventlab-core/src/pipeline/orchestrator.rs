//! Batch orchestration: one scheduler job per ticker.
//!
//! Each job resolves its window, takes one limiter permit, fetches, checks
//! the series length, derives returns against the benchmark and commits.
//! Every stage yields `Result<_, JobFailure>`; failures become warnings and
//! never abort the batch.

use super::progress::{BatchProgress, NoProgress, ProgressSink};
use super::store::SharedStore;
use super::warnings::{Stage, Warning, WarningLog};
use crate::concurrency::{RateLimiter, SchedulerError, TaskError, TaskScheduler};
use crate::data::PriceProvider;
use crate::domain::{
    cumulative_returns, log_returns, BenchmarkReturns, EventData, PricePoint, TradingCalendar,
};
use crate::window::{resolve, EventWindow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// One ticker to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    pub ticker: String,
    pub announcement: NaiveDate,
}

impl Job {
    pub fn new(ticker: impl Into<String>, announcement: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            announcement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// N: trading days on each side of the event day.
    pub half_width: usize,
    pub workers: usize,
    /// Provider calls admitted per second across all workers (0 = unlimited).
    pub max_calls_per_second: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            half_width: 60,
            workers: 12,
            max_calls_per_second: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
    pub warnings: Vec<Warning>,
    /// Announcements moved to the previous trading day. Informational only;
    /// the job may still have succeeded.
    #[serde(default)]
    pub adjustments: Vec<Warning>,
}

impl BatchReport {
    pub fn warnings_for<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a Warning> + 'a {
        self.warnings.iter().filter(move |w| w.ticker == ticker)
    }
}

/// Why one ticker was abandoned.
#[derive(Debug, Clone, PartialEq)]
struct JobFailure {
    stage: Stage,
    message: String,
}

impl JobFailure {
    fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Everything a job needs, shared by `Arc` with every worker.
struct JobContext {
    provider: Arc<dyn PriceProvider>,
    limiter: Arc<RateLimiter>,
    calendar: Arc<TradingCalendar>,
    benchmark: Arc<BenchmarkReturns>,
    store: Arc<SharedStore>,
    warnings: WarningLog,
    adjustments: WarningLog,
    progress: BatchProgress,
    sink: Arc<dyn ProgressSink>,
    half_width: usize,
}

impl JobContext {
    fn run_job(&self, job: &Job) {
        let outcome = self.process(job);
        if let Err(failure) = &outcome {
            debug!(ticker = %job.ticker, stage = %failure.stage, "{}", failure.message);
            self.warnings
                .push(Warning::new(&job.ticker, failure.stage, &failure.message));
        }
        let snapshot = self.progress.record(outcome.is_ok());
        self.sink.on_job_done(&job.ticker, &snapshot);
    }

    fn process(&self, job: &Job) -> Result<(), JobFailure> {
        let window = resolve(&self.calendar, job.announcement, self.half_width)
            .map_err(|e| JobFailure::new(Stage::Window, e.to_string()))?;
        if let Some(note) = &window.note {
            debug!(ticker = %job.ticker, "{note}");
            self.adjustments
                .push(Warning::new(&job.ticker, Stage::Window, note));
        }

        self.limiter.acquire();
        let prices = self
            .provider
            .fetch(&job.ticker, window.start, window.end)
            .map_err(|e| JobFailure::new(Stage::Fetch, e.to_string()))?;
        if prices.is_empty() {
            return Err(JobFailure::new(
                Stage::Fetch,
                format!("{} returned no prices", self.provider.name()),
            ));
        }

        let expected = window.expected_prices();
        if prices.len() != expected {
            return Err(JobFailure::new(
                Stage::Alignment,
                format!(
                    "price series size mismatch: expected {expected} points, got {}",
                    prices.len()
                ),
            ));
        }

        let event = derive_event(&window, &self.calendar, &self.benchmark, prices)?;
        self.store
            .commit_event(&job.ticker, event)
            .map_err(|e| JobFailure::new(Stage::Commit, e.to_string()))
    }
}

/// Build the committed series from a length-checked price window.
///
/// Stock return `i` is paired with the benchmark return of calendar day
/// `event_index - N + 1 + i`.
fn derive_event(
    window: &EventWindow,
    calendar: &TradingCalendar,
    benchmark: &BenchmarkReturns,
    prices: Vec<PricePoint>,
) -> Result<EventData, JobFailure> {
    let returns =
        log_returns(&prices).map_err(|e| JobFailure::new(Stage::Alignment, e.to_string()))?;

    let days = window.return_days(calendar);
    let mut abnormal_returns = Vec::with_capacity(returns.len());
    for (day, stock_return) in days.iter().zip(&returns) {
        let bench = benchmark.get(*day).ok_or_else(|| {
            JobFailure::new(Stage::Alignment, format!("no benchmark return for date {day}"))
        })?;
        abnormal_returns.push(stock_return - bench);
    }

    Ok(EventData {
        window: window.bounds(),
        cumulative_returns: cumulative_returns(&returns),
        prices,
        returns,
        abnormal_returns,
        adjustment_note: window.note.clone(),
    })
}

/// Runs fetch batches with a fresh worker pool per batch.
pub struct Pipeline {
    provider: Arc<dyn PriceProvider>,
    config: PipelineConfig,
    limiter: Arc<RateLimiter>,
    sink: Arc<dyn ProgressSink>,
}

impl Pipeline {
    pub fn new(provider: Arc<dyn PriceProvider>, config: PipelineConfig) -> Self {
        Self {
            provider,
            limiter: Arc::new(RateLimiter::new(config.max_calls_per_second)),
            config,
            sink: Arc::new(NoProgress),
        }
    }

    /// Share an existing limiter, e.g. to observe permits from outside.
    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetch and commit every job, then return once the pool is drained.
    ///
    /// Tickers missing from `store` are reported, never created.
    pub fn run(
        &self,
        jobs: Vec<Job>,
        calendar: Arc<TradingCalendar>,
        benchmark: Arc<BenchmarkReturns>,
        store: Arc<SharedStore>,
    ) -> Result<BatchReport, PipelineError> {
        let started = Instant::now();
        let total = jobs.len();
        self.limiter.configure(self.config.max_calls_per_second);

        let ctx = Arc::new(JobContext {
            provider: Arc::clone(&self.provider),
            limiter: Arc::clone(&self.limiter),
            calendar,
            benchmark,
            store,
            warnings: WarningLog::new(),
            adjustments: WarningLog::new(),
            progress: BatchProgress::new(total),
            sink: Arc::clone(&self.sink),
            half_width: self.config.half_width,
        });

        info!(
            jobs = total,
            workers = self.config.workers,
            calls_per_second = self.config.max_calls_per_second,
            half_width = self.config.half_width,
            provider = self.provider.name(),
            "starting fetch batch"
        );

        let scheduler = TaskScheduler::with_name("eventlab-fetch", self.config.workers)?;
        let mut handles = Vec::with_capacity(total);
        for job in jobs {
            let task_ctx = Arc::clone(&ctx);
            let ticker = job.ticker.clone();
            match scheduler.submit(move || task_ctx.run_job(&job)) {
                Ok(handle) => handles.push((ticker, handle)),
                Err(e) => {
                    scheduler.stop_now();
                    return Err(e.into());
                }
            }
        }

        scheduler.drain();
        scheduler.stop_gracefully();

        for (ticker, handle) in handles {
            if let Err(TaskError::Panicked(msg)) = handle.wait() {
                warn!(ticker = %ticker, "fetch job panicked: {msg}");
                ctx.warnings
                    .push(Warning::new(&ticker, Stage::Task, format!("job panicked: {msg}")));
                let snapshot = ctx.progress.record(false);
                self.sink.on_job_done(&ticker, &snapshot);
            }
        }

        let snapshot = ctx.progress.snapshot();
        self.sink.on_batch_done(&snapshot);

        let report = BatchReport {
            total,
            succeeded: snapshot.succeeded,
            failed: snapshot.failed,
            elapsed: started.elapsed(),
            warnings: ctx.warnings.snapshot(),
            adjustments: ctx.adjustments.snapshot(),
        };
        info!(
            succeeded = report.succeeded,
            total = report.total,
            warnings = report.warnings.len(),
            adjusted = report.adjustments.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "fetch batch complete"
        );
        Ok(report)
    }
}
