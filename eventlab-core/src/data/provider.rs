//! Price provider trait and structured error types.
//!
//! The pipeline only sees this trait, so the EODHD client, the offline CSV
//! source and test stubs are interchangeable.

use crate::domain::PricePoint;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for price fetches.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider while fetching {ticker}")]
    RateLimited { ticker: String },

    #[error("HTTP {status} for {ticker}")]
    HttpStatus { ticker: String, status: u16 },

    #[error("empty response body for {ticker}")]
    EmptyResponse { ticker: String },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("gave up on {ticker} after {attempts} attempts (last error: {last})")]
    RetriesExhausted {
        ticker: String,
        attempts: u32,
        last: String,
    },

    #[error("API token unavailable: {0}")]
    TokenUnavailable(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DataError {
    /// Errors worth another attempt. Token and local I/O problems are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_)
                | DataError::RateLimited { .. }
                | DataError::HttpStatus { .. }
                | DataError::EmptyResponse { .. }
        )
    }
}

/// A source of daily adjusted closes.
///
/// Implementations are shared by every pipeline worker, so they must be
/// `Send + Sync` and handle their own retries. The returned series is
/// ordered by date and may legitimately be empty.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch adjusted closes for `ticker` over `from..=to`.
    fn fetch(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, DataError>;
}
