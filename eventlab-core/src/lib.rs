//! EventLab Core: trading calendar, event windows, and the concurrent fetch pipeline.
//!
//! This crate contains the data-acquisition heart of the earnings event study:
//! - Domain types (earnings records, price points, stock records, groups)
//! - Trading calendar and event-window resolution
//! - Fixed-window request throttle shared by all workers
//! - Bounded worker pool with drain barrier and graceful/immediate shutdown
//! - Price provider trait and the EOD Historical Data client
//! - Pipeline orchestrator that fetches, aligns and commits per-ticker windows

pub mod concurrency;
pub mod data;
pub mod domain;
pub mod pipeline;
pub mod window;

pub use concurrency::{RateLimiter, SchedulerError, TaskError, TaskHandle, TaskScheduler};
pub use data::{CsvDirProvider, DataError, EodhdProvider, PriceProvider, RetryPolicy};
pub use domain::{BenchmarkReturns, EarningsInfo, Group, PricePoint, StockRecord, TradingCalendar};
pub use pipeline::{
    BatchReport, Job, Pipeline, PipelineConfig, PipelineError, ProgressSink, SharedStore, Stage,
    Warning, WarningLog,
};
pub use window::{resolve, EventWindow, WindowError};
