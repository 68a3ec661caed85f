//! Study configuration, loaded from TOML.
//!
//! Every section has defaults, so an empty file is a valid configuration.

use chrono::NaiveDate;
use eventlab_core::{PipelineConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Smallest and largest accepted half-window N.
pub const MIN_HALF_WIDTH: usize = 30;
pub const MAX_HALF_WIDTH: usize = 60;
pub const DEFAULT_HALF_WIDTH: usize = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config TOML: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StudyConfig {
    pub data: DataConfig,
    pub benchmark: BenchmarkConfig,
    pub window: WindowConfig,
    pub fetch: FetchConfig,
    pub bootstrap: BootstrapConfig,
    pub grouping: GroupingConfig,
}

/// Input files and output location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub earnings_file: PathBuf,
    pub sector_file: PathBuf,
    pub token_file: PathBuf,
    /// Read prices from `<dir>/<TICKER>.csv` instead of the API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            earnings_file: PathBuf::from("Russell3000EarningsAnnouncements.csv"),
            sector_file: PathBuf::from("iShares-Russell-3000-ETF_fund.csv"),
            token_file: PathBuf::from("api_token.txt"),
            price_dir: None,
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    pub ticker: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            ticker: "IWV".to_string(),
            from: NaiveDate::from_ymd_opt(2023, 12, 1).unwrap_or(NaiveDate::MIN),
            to: NaiveDate::from_ymd_opt(2025, 12, 30).unwrap_or(NaiveDate::MIN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// N: trading days on each side of the announcement.
    pub half_width: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            half_width: DEFAULT_HALF_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub workers: usize,
    /// 0 disables throttling.
    pub max_calls_per_second: u32,
    pub max_attempts: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: 12,
            max_calls_per_second: 30,
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Resamples per group.
    pub samples: usize,
    /// Stocks drawn (with replacement) per resample.
    pub sample_size: usize,
    /// Fixed master seed; a random one is drawn and logged when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            samples: 40,
            sample_size: 30,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    /// Share of each sector trimmed from both tails, rounded up.
    pub trim_fraction: f64,
    /// Sectors left out of grouping altogether.
    pub excluded_sectors: Vec<String>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            trim_fraction: 0.02,
            excluded_sectors: vec!["Other".to_string()],
        }
    }
}

/// Bring N into `30..=60`; anything outside becomes 60.
pub fn clamp_half_width(requested: usize) -> usize {
    if (MIN_HALF_WIDTH..=MAX_HALF_WIDTH).contains(&requested) {
        requested
    } else {
        let reason = if requested < MIN_HALF_WIDTH {
            "too small"
        } else {
            "too large"
        };
        warn!(requested, "N {reason}, set to {DEFAULT_HALF_WIDTH}");
        DEFAULT_HALF_WIDTH
    }
}

impl StudyConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Clamp N and reject settings no study can run with.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.window.half_width = clamp_half_width(self.window.half_width);

        if self.benchmark.from >= self.benchmark.to {
            return Err(ConfigError::Invalid(format!(
                "benchmark range is empty: {} .. {}",
                self.benchmark.from, self.benchmark.to
            )));
        }
        if self.benchmark.ticker.trim().is_empty() {
            return Err(ConfigError::Invalid("benchmark ticker is empty".into()));
        }
        if self.bootstrap.samples == 0 || self.bootstrap.sample_size == 0 {
            return Err(ConfigError::Invalid(
                "bootstrap samples and sample_size must be positive".into(),
            ));
        }
        if !(0.0..0.5).contains(&self.grouping.trim_fraction) {
            return Err(ConfigError::Invalid(format!(
                "trim_fraction must be in [0, 0.5), got {}",
                self.grouping.trim_fraction
            )));
        }
        Ok(self)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            half_width: self.window.half_width,
            workers: self.fetch.workers,
            max_calls_per_second: self.fetch.max_calls_per_second,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.fetch.max_attempts)
    }
}
