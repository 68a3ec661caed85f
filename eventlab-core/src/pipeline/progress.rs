//! Batch progress counters and sinks.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Point-in-time view of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total: usize,
    pub done: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.done as f64 / self.total as f64 * 100.0
        }
    }
}

/// Lock-free success/failure counters shared by the workers.
#[derive(Debug)]
pub struct BatchProgress {
    total: usize,
    succeeded: AtomicUsize,
    failed: AtomicUsize,
    started: Instant,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            succeeded: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    /// Count one finished job and return the snapshot right after it.
    pub fn record(&self, success: bool) -> ProgressSnapshot {
        if success {
            self.succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        ProgressSnapshot {
            total: self.total,
            done: succeeded + failed,
            succeeded,
            failed,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Receives a snapshot after every finished job, from worker threads.
pub trait ProgressSink: Send + Sync {
    fn on_job_done(&self, ticker: &str, snapshot: &ProgressSnapshot);

    fn on_batch_done(&self, _snapshot: &ProgressSnapshot) {}
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_job_done(&self, _ticker: &str, _snapshot: &ProgressSnapshot) {}
}

/// Logs through `tracing` each time another `step_percent` of the batch is done.
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    step_percent: usize,
}

impl LogProgress {
    pub fn new(step_percent: usize) -> Self {
        Self {
            step_percent: step_percent.clamp(1, 100),
        }
    }

    fn crosses_step(&self, done: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        let bucket = |n: usize| n * 100 / total / self.step_percent;
        done == total || bucket(done) != bucket(done.saturating_sub(1))
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ProgressSink for LogProgress {
    fn on_job_done(&self, _ticker: &str, s: &ProgressSnapshot) {
        if self.crosses_step(s.done, s.total) {
            info!(
                done = s.done,
                total = s.total,
                succeeded = s.succeeded,
                failed = s.failed,
                "fetch progress {:.0}%",
                s.percentage()
            );
        }
    }

    fn on_batch_done(&self, s: &ProgressSnapshot) {
        info!(
            succeeded = s.succeeded,
            total = s.total,
            elapsed_ms = s.elapsed.as_millis() as u64,
            "fetch batch finished"
        );
    }
}
