//! Event-study runner built on `eventlab-core`.
//!
//! This crate provides:
//! - TOML study configuration with validated defaults
//! - Earnings and sector CSV loading
//! - Sector-neutral Miss / Meet / Beat grouping
//! - Benchmark preparation (calendar and daily returns)
//! - Seeded, parallel bootstrap of AAR / CAAR per group
//! - Cross-sample statistics, text reports, CSV/JSON export and gnuplot output
//! - The end-to-end [`Study`] tying these together

pub mod benchmark;
pub mod bootstrap;
pub mod config;
pub mod export;
pub mod grouping;
pub mod loader;
pub mod plot;
pub mod report;
pub mod stats;
pub mod study;

pub use benchmark::{prepare_benchmark, BenchmarkData, BenchmarkError};
pub use bootstrap::{run_bootstrap, sub_seed, BootstrapResult, GroupSamples};
pub use config::{clamp_half_width, ConfigError, StudyConfig};
pub use export::{export_study, ExportError, ExportPaths, StudySummary};
pub use grouping::{assign_groups, GroupingSummary};
pub use loader::{load_earnings, load_sectors, EarningsLoad, LoadError};
pub use plot::{gnuplot_script, plot_caar, PlotError};
pub use stats::{day_labels, price_labels, GroupStats, StudyStats, SummaryRow};
pub use study::{Study, StudyError, StudyResult, StudyUniverse};
