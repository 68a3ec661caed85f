//! Concurrency primitives for the fetch pipeline.

pub mod rate_limiter;
pub mod scheduler;

pub use rate_limiter::RateLimiter;
pub use scheduler::{SchedulerError, TaskError, TaskHandle, TaskScheduler};
