//! EOD Historical Data provider.
//!
//! Fetches daily bars as CSV from the `/api/eod/{TICKER}.US` endpoint and
//! keeps the adjusted close. Retries follow [`RetryPolicy`].

use super::provider::{DataError, PriceProvider};
use super::retry::RetryPolicy;
use crate::domain::{parse_trading_day, PricePoint};
use chrono::NaiveDate;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://eodhistoricaldata.com/api/eod";

/// Environment variable checked before the token file.
pub const TOKEN_ENV_VAR: &str = "EODHD_API_TOKEN";

/// API token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Result<Self, DataError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(DataError::TokenUnavailable("token is empty".into()));
        }
        Ok(Self(token))
    }

    /// First line of `path`.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let first = text.lines().next().unwrap_or_default();
        Self::new(first).map_err(|_| {
            DataError::TokenUnavailable(format!("first line of {} is empty", path.display()))
        })
    }

    /// `EODHD_API_TOKEN` if set and non-empty, otherwise the token file.
    pub fn resolve(token_file: &Path) -> Result<Self, DataError> {
        match std::env::var(TOKEN_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => Self::new(value),
            _ => Self::from_file(token_file),
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

pub struct EodhdProvider {
    client: reqwest::blocking::Client,
    token: ApiToken,
    base_url: String,
    exchange_suffix: String,
    retry: RetryPolicy,
}

impl EodhdProvider {
    pub fn new(token: ApiToken) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            exchange_suffix: ".US".to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_exchange_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.exchange_suffix = suffix.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn eod_url(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> String {
        format!(
            "{}/{ticker}{}?from={from}&to={to}&api_token={}&period=d",
            self.base_url,
            self.exchange_suffix,
            self.token.expose()
        )
    }

    /// One HTTP round trip. Errors never include the URL, which carries the token.
    fn fetch_once(&self, ticker: &str, url: &str) -> Result<Vec<PricePoint>, DataError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| DataError::NetworkUnreachable(e.without_url().to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                ticker: ticker.to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                ticker: ticker.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| DataError::NetworkUnreachable(e.without_url().to_string()))?;
        if body.trim().is_empty() {
            return Err(DataError::EmptyResponse {
                ticker: ticker.to_string(),
            });
        }
        parse_eod_csv(&body)
    }
}

impl PriceProvider for EodhdProvider {
    fn name(&self) -> &str {
        "eodhd"
    }

    fn fetch(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, DataError> {
        let url = self.eod_url(ticker, from, to);
        let result = self.retry.run(ticker, |_| self.fetch_once(ticker, &url));
        if let Err(e) = &result {
            warn!(ticker, error = %e, "price fetch failed");
        }
        result
    }
}

/// Parse an EOD CSV body (`Date,Open,High,Low,Close,Adjusted_close,Volume`).
///
/// Rows with fewer than six fields, an unreadable date or a non-numeric
/// adjusted close are skipped. The result is sorted by date.
pub fn parse_eod_csv(text: &str) -> Result<Vec<PricePoint>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut points = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataError::ResponseFormat(e.to_string()))?;
        if record.len() < 6 {
            continue;
        }
        let Ok(date) = parse_trading_day(&record[0]) else {
            continue;
        };
        let Ok(adj_close) = record[5].parse::<f64>() else {
            continue;
        };
        points.push(PricePoint::new(date, adj_close));
    }
    points.sort_by_key(|p| p.date);
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Adjusted_close,Volume
2024-01-03,10,11,9,10.5,10.4,1000
2024/1/2,10,11,9,10.1,10.0,1200
2024-01-04,10,11,9,10.8,NA,900
2024-01-05,10,11
";

    #[test]
    fn parses_adjusted_close_and_sorts() {
        let points = parse_eod_csv(SAMPLE).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(points[0].adj_close, 10.0);
        assert_eq!(points[1].adj_close, 10.4);
    }

    #[test]
    fn header_only_body_is_empty_series() {
        let points = parse_eod_csv("Date,Open,High,Low,Close,Adjusted_close,Volume\n").unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn url_layout() {
        let provider = EodhdProvider::new(ApiToken::new("secret").unwrap())
            .unwrap()
            .with_base_url("http://localhost:9/api/eod/");
        let d = |m, day| NaiveDate::from_ymd_opt(2024, m, day).unwrap();
        assert_eq!(
            provider.eod_url("IWV", d(1, 2), d(3, 4)),
            "http://localhost:9/api/eod/IWV.US?from=2024-01-02&to=2024-03-04&api_token=secret&period=d"
        );
    }

    #[test]
    fn token_debug_is_redacted() {
        let token = ApiToken::new("  abc123 \n").unwrap();
        assert_eq!(token.expose(), "abc123");
        assert_eq!(format!("{token:?}"), "ApiToken(***)");
        assert!(ApiToken::new("   ").is_err());
    }
}
