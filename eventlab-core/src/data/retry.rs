//! Per-call retry with backoff.
//!
//! Rate-limit responses back off exponentially (1 s, 2 s, 4 s, ...) plus up
//! to 199 ms of jitter; other transient failures back off linearly (1 s,
//! 2 s, ...). This only decides the fate of a single call that has already
//! been admitted by the pipeline's rate limiter.

use super::provider::DataError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (default: 5).
    pub max_attempts: u32,
    /// First rate-limit backoff, doubled on every attempt (default: 1s).
    pub rate_limit_base: Duration,
    /// Exclusive upper bound on the jitter added to rate-limit backoff.
    pub max_jitter: Duration,
    /// Linear backoff step for other failures (default: 1s).
    pub failure_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            rate_limit_base: Duration::from_secs(1),
            max_jitter: Duration::from_millis(200),
            failure_step: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Same attempt budget, no sleeping. Meant for tests and local sources.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            rate_limit_base: Duration::ZERO,
            max_jitter: Duration::ZERO,
            failure_step: Duration::ZERO,
        }
    }

    /// Backoff after the rate-limited attempt number `attempt` (0-based).
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let base = self.rate_limit_base.saturating_mul(factor);
        let jitter_ms = self.max_jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..jitter_ms))
    }

    /// Backoff after the failed attempt number `attempt` (0-based).
    pub fn failure_delay(&self, attempt: u32) -> Duration {
        self.failure_step.saturating_mul(attempt.saturating_add(1))
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `op` receives the 0-based attempt number. No sleep follows the final
    /// attempt.
    pub fn run<T, F>(&self, ticker: &str, mut op: F) -> Result<T, DataError>
    where
        F: FnMut(u32) -> Result<T, DataError>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt + 1 < attempts {
                        let delay = match e {
                            DataError::RateLimited { .. } => self.rate_limit_delay(attempt),
                            _ => self.failure_delay(attempt),
                        };
                        debug!(
                            ticker,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "retrying fetch"
                        );
                        std::thread::sleep(delay);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(DataError::RetriesExhausted {
            ticker: ticker.to_string(),
            attempts,
            last: last_error.map(|e| e.to_string()).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_backoff_doubles_with_bounded_jitter() {
        let policy = RetryPolicy::default();
        for attempt in 0..5 {
            let d = policy.rate_limit_delay(attempt);
            let base = Duration::from_secs(1 << attempt);
            assert!(d >= base, "attempt {attempt}: {d:?}");
            assert!(d < base + Duration::from_millis(200), "attempt {attempt}: {d:?}");
        }
    }

    #[test]
    fn failure_backoff_is_linear() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.failure_delay(0), Duration::from_secs(1));
        assert_eq!(policy.failure_delay(3), Duration::from_secs(4));
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::immediate(5);
        let result = policy.run("AAPL", |attempt| {
            if attempt < 2 {
                Err(DataError::HttpStatus {
                    ticker: "AAPL".into(),
                    status: 503,
                })
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 2);
    }

    #[test]
    fn exhaustion_reports_attempts_and_last_error() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let err = policy
            .run::<(), _>("MSFT", |_| {
                calls += 1;
                Err(DataError::RateLimited {
                    ticker: "MSFT".into(),
                })
            })
            .unwrap_err();
        assert_eq!(calls, 3);
        match err {
            DataError::RetriesExhausted {
                ticker,
                attempts,
                last,
            } => {
                assert_eq!(ticker, "MSFT");
                assert_eq!(attempts, 3);
                assert!(last.contains("rate limited"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn permanent_error_stops_immediately() {
        let policy = RetryPolicy::immediate(5);
        let mut calls = 0;
        let err = policy
            .run::<(), _>("T", |_| {
                calls += 1;
                Err(DataError::TokenUnavailable("no token".into()))
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, DataError::TokenUnavailable(_)));
    }
}
