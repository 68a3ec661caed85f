//! Concurrent fetch pipeline: shared store, warning log, progress and the
//! orchestrator that ties the scheduler, limiter and provider together.

pub mod orchestrator;
pub mod progress;
pub mod store;
pub mod warnings;

pub use orchestrator::{BatchReport, Job, Pipeline, PipelineConfig, PipelineError};
pub use progress::{BatchProgress, LogProgress, NoProgress, ProgressSink, ProgressSnapshot};
pub use store::{SharedStore, StoreError};
pub use warnings::{Stage, Warning, WarningLog};
