//! EventLab CLI: earnings event study over the Russell 3000 universe.
//!
//! Commands:
//! - `run`: load, group, pull prices, bootstrap and report
//! - `init-config`: write the default study config as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use eventlab_core::data::ApiToken;
use eventlab_core::pipeline::LogProgress;
use eventlab_core::{CsvDirProvider, EodhdProvider, Group, PriceProvider};
use eventlab_runner::report::{
    adjustments_report, batch_report, group_summary, grouping_report, stock_report, time_series_table,
    warnings_report,
};
use eventlab_runner::{export_study, plot_caar, Study, StudyConfig, StudyResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = "eventlab.toml";

#[derive(Parser)]
#[command(name = "eventlab", about = "EventLab CLI: earnings announcement event study")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full study and print group summaries.
    Run {
        /// Path to a TOML config file. Defaults to ./eventlab.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Trading days on each side of the announcement (30..=60).
        #[arg(long)]
        half_width: Option<usize>,

        /// Fetch worker threads.
        #[arg(long)]
        workers: Option<usize>,

        /// Provider calls per second across all workers (0 = unlimited).
        #[arg(long)]
        qps: Option<u32>,

        /// Bootstrap master seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Read prices from `<dir>/<TICKER>.csv` instead of the API.
        #[arg(long)]
        price_dir: Option<PathBuf>,

        /// Print the detail report for these tickers.
        #[arg(long = "ticker")]
        tickers: Vec<String>,

        /// Only summarise these groups (beat, meet, miss). Defaults to all.
        #[arg(long = "group")]
        groups: Vec<Group>,

        /// Also print the day-by-day AAR/CAAR table for each group.
        #[arg(long, default_value_t = false)]
        series: bool,

        /// Print every pipeline warning.
        #[arg(long, default_value_t = false)]
        show_warnings: bool,

        /// Write caar.csv, summary.json and warnings.txt to the output dir.
        #[arg(long, default_value_t = false)]
        export: bool,

        /// Plot the three CAAR curves with gnuplot.
        #[arg(long, default_value_t = false)]
        plot: bool,
    },
    /// Write the default study config.
    InitConfig {
        /// Destination path.
        #[arg(long, default_value = DEFAULT_CONFIG)]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

/// Overrides taken from `run` flags.
struct Overrides {
    half_width: Option<usize>,
    workers: Option<usize>,
    qps: Option<u32>,
    seed: Option<u64>,
    price_dir: Option<PathBuf>,
}

/// What to print once the study is done.
struct Output {
    tickers: Vec<String>,
    groups: Vec<Group>,
    series: bool,
    show_warnings: bool,
    export: bool,
    plot: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            half_width,
            workers,
            qps,
            seed,
            price_dir,
            tickers,
            groups,
            series,
            show_warnings,
            export,
            plot,
        } => run_study_cmd(
            config,
            Overrides {
                half_width,
                workers,
                qps,
                seed,
                price_dir,
            },
            Output {
                tickers,
                groups,
                series,
                show_warnings,
                export,
                plot,
            },
        ),
        Commands::InitConfig { output, force } => run_init_config(&output, force),
    }
}

fn load_config(path: Option<PathBuf>, overrides: Overrides) -> Result<StudyConfig> {
    let mut config = match path {
        Some(path) => StudyConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG).exists() => {
            StudyConfig::from_file(Path::new(DEFAULT_CONFIG))?
        }
        None => {
            info!("no config file, using study defaults");
            StudyConfig::default()
        }
    };

    if let Some(n) = overrides.half_width {
        config.window.half_width = n;
    }
    if let Some(w) = overrides.workers {
        config.fetch.workers = w;
    }
    if let Some(q) = overrides.qps {
        config.fetch.max_calls_per_second = q;
    }
    if let Some(s) = overrides.seed {
        config.bootstrap.seed = Some(s);
    }
    if overrides.price_dir.is_some() {
        config.data.price_dir = overrides.price_dir;
    }
    Ok(config.validated()?)
}

fn build_provider(config: &StudyConfig) -> Result<Arc<dyn PriceProvider>> {
    if let Some(dir) = &config.data.price_dir {
        info!(dir = %dir.display(), "reading prices from CSV directory");
        return Ok(Arc::new(CsvDirProvider::new(dir)));
    }
    let token = ApiToken::resolve(&config.data.token_file)
        .context("no API token; set EODHD_API_TOKEN or configure data.token_file")?;
    let provider = EodhdProvider::new(token)?.with_retry(config.retry_policy());
    Ok(Arc::new(provider))
}

fn run_study_cmd(config: Option<PathBuf>, overrides: Overrides, output: Output) -> Result<()> {
    let config = load_config(config, overrides)?;
    let provider = build_provider(&config)?;

    let study = Study::new(config.clone(), provider).with_progress(Arc::new(LogProgress::default()));
    let result = study.run().context("study failed")?;

    print_result(&result, &output);

    if output.export {
        let paths = export_study(&result, &config.data.output_dir)?;
        println!("Wrote {}", paths.caar_csv.display());
        println!("Wrote {}", paths.summary_json.display());
        println!("Wrote {}", paths.warnings_txt.display());
    }

    if output.plot {
        if let Err(e) = plot_caar(&result.stats) {
            warn!("plot skipped: {e}");
        }
    }
    Ok(())
}

fn print_result(result: &StudyResult, output: &Output) {
    print!("{}", grouping_report(&result.grouping));
    print!("{}", batch_report(&result.batch));
    println!(
        "Benchmark {}: {} trading days, bootstrap seed {}",
        result.benchmark_ticker,
        result.trading_days,
        result.bootstrap.seed
    );

    if !result.batch.adjustments.is_empty() {
        println!("\n===== Trading Day Warnings =====");
        print!("{}", adjustments_report(&result.batch.adjustments));
    }

    if output.show_warnings {
        println!("\n===== Stock-Level Warnings =====");
        print!("{}", warnings_report(&result.batch.warnings));
    }

    for ticker in &output.tickers {
        match result.record(ticker) {
            Some(record) => println!("\n{}", stock_report(record)),
            None => println!("\nTicker {ticker} not found."),
        }
    }

    let groups: &[Group] = if output.groups.is_empty() {
        &Group::ALL
    } else {
        &output.groups
    };
    for group in groups {
        if let Some(stats) = result.stats.group(*group) {
            println!();
            print!("{}", group_summary(*group, stats));
        }
        if output.series {
            println!();
            print!("{}", time_series_table(*group, &result.stats));
        }
    }
}

fn run_init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            output.display()
        );
    }
    let text = StudyConfig::default().to_toml()?;
    std::fs::write(output, text)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {}", output.display());
    Ok(())
}
