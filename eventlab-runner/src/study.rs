//! End-to-end event study: universe preparation, pull, analysis.
//!
//! ```text
//! earnings.csv + sectors.csv ─▶ grouping ─▶ SharedStore
//!                                             │
//! benchmark ─▶ calendar + returns ─▶ Pipeline::run ─▶ bootstrap ─▶ stats
//! ```

use crate::benchmark::{prepare_benchmark, BenchmarkData, BenchmarkError};
use crate::bootstrap::{run_bootstrap, BootstrapResult};
use crate::config::StudyConfig;
use crate::grouping::{assign_groups, GroupingSummary};
use crate::loader::{load_earnings, load_sectors, LoadError};
use crate::stats::StudyStats;
use eventlab_core::pipeline::{NoProgress, ProgressSink};
use eventlab_core::{
    BatchReport, Pipeline, PipelineError, PriceProvider, SharedStore, StockRecord,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StudyError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("no stocks were assigned to a group")]
    EmptyUniverse,
}

/// Grouped records ready to be pulled.
#[derive(Debug, Clone)]
pub struct StudyUniverse {
    pub records: BTreeMap<String, StockRecord>,
    pub skipped_rows: usize,
    pub enriched: usize,
    pub grouping: GroupingSummary,
}

impl StudyUniverse {
    /// Group already-loaded records.
    pub fn from_records(
        records: BTreeMap<String, StockRecord>,
        config: &StudyConfig,
    ) -> Result<Self, StudyError> {
        let (records, grouping) = assign_groups(records, &config.grouping);
        if records.is_empty() {
            return Err(StudyError::EmptyUniverse);
        }
        Ok(Self {
            records,
            skipped_rows: 0,
            enriched: 0,
            grouping,
        })
    }

    /// Load earnings and sectors from the configured files, then group.
    pub fn load(config: &StudyConfig) -> Result<Self, StudyError> {
        let load = load_earnings(&config.data.earnings_file)?;
        let mut records = load.records;
        let enriched = load_sectors(&config.data.sector_file, &mut records)?;
        let mut universe = Self::from_records(records, config)?;
        universe.skipped_rows = load.skipped;
        universe.enriched = enriched;
        Ok(universe)
    }
}

/// Everything a finished study produced.
#[derive(Debug, Clone)]
pub struct StudyResult {
    pub grouping: GroupingSummary,
    pub benchmark_ticker: String,
    pub trading_days: usize,
    /// Grouped records after the pull, with or without event data.
    pub records: BTreeMap<String, StockRecord>,
    pub batch: BatchReport,
    pub bootstrap: BootstrapResult,
    pub stats: StudyStats,
}

impl StudyResult {
    pub fn record(&self, ticker: &str) -> Option<&StockRecord> {
        self.records
            .get(ticker)
            .or_else(|| self.records.get(&ticker.to_ascii_uppercase()))
    }

    pub fn half_width(&self) -> usize {
        self.stats.half_width
    }
}

pub struct Study {
    config: StudyConfig,
    provider: Arc<dyn PriceProvider>,
    progress: Arc<dyn ProgressSink>,
}

impl Study {
    pub fn new(config: StudyConfig, provider: Arc<dyn PriceProvider>) -> Self {
        Self {
            config,
            provider,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    /// Load, pull and analyse using the configured input files.
    pub fn run(&self) -> Result<StudyResult, StudyError> {
        let universe = StudyUniverse::load(&self.config)?;
        self.run_universe(universe)
    }

    /// Pull prices for a prepared universe and analyse them.
    pub fn run_universe(&self, universe: StudyUniverse) -> Result<StudyResult, StudyError> {
        let benchmark = prepare_benchmark(self.provider.as_ref(), &self.config.benchmark)?;
        let (records, batch) = self.pull(&benchmark, universe.records)?;
        Ok(self.analyse(universe.grouping, &benchmark, records, batch))
    }

    fn pull(
        &self,
        benchmark: &BenchmarkData,
        records: BTreeMap<String, StockRecord>,
    ) -> Result<(BTreeMap<String, StockRecord>, BatchReport), StudyError> {
        let store = Arc::new(SharedStore::from_records(records.into_values()));
        let jobs = store.jobs();

        let pipeline = Pipeline::new(Arc::clone(&self.provider), self.config.pipeline_config())
            .with_progress(Arc::clone(&self.progress));
        let batch = pipeline.run(
            jobs,
            Arc::new(benchmark.calendar.clone()),
            Arc::new(benchmark.returns.clone()),
            Arc::clone(&store),
        )?;

        let records = store
            .snapshot()
            .into_iter()
            .map(|r| (r.ticker.clone(), r))
            .collect();
        Ok((records, batch))
    }

    fn analyse(
        &self,
        grouping: GroupingSummary,
        benchmark: &BenchmarkData,
        records: BTreeMap<String, StockRecord>,
        batch: BatchReport,
    ) -> StudyResult {
        let half_width = self.config.window.half_width;
        let seed = self.config.bootstrap.seed.unwrap_or_else(|| {
            let seed = rand::random();
            info!(seed, "no bootstrap seed configured, drew one");
            seed
        });

        let pulled: Vec<StockRecord> = records.values().cloned().collect();
        let bootstrap = run_bootstrap(&pulled, half_width, &self.config.bootstrap, seed);
        let stats = StudyStats::from_bootstrap(&bootstrap);

        StudyResult {
            grouping,
            benchmark_ticker: benchmark.ticker.clone(),
            trading_days: benchmark.calendar.len(),
            records,
            batch,
            bootstrap,
            stats,
        }
    }
}
