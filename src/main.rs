//! Review-Harvest main entry point
//!
//! This is the command-line interface for the daily review harvester.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use review_harvest::config::{load_config_with_hash, Config};
use review_harvest::crawler::{run_daily, DailyInputs};
use review_harvest::driver::SnapshotDriverFactory;
use review_harvest::harvest::{retrieval_date_for, RetrievalWindow};
use review_harvest::notify::notifier_from_config;
use review_harvest::output::{aggregate, print_tally, tally_names, tally_records};
use review_harvest::storage::FsArtifactStore;
use review_harvest::topology::{load_locations, resolve};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Review-Harvest: an incremental review harvester
///
/// Harvests reviews inside a date window for every location and competitor
/// in the seed file, skips competitors that share an address, and writes
/// merged, date-stamped JSON files for downstream import.
#[derive(Parser, Debug)]
#[command(name = "review-harvest")]
#[command(version)]
#[command(about = "An incremental review harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Seed file of locations, overriding `storage.locations-path`
    #[arg(long, value_name = "FILE")]
    locations: Option<PathBuf>,

    /// First day of the retrieval window (YYYY-MM-DD, default yesterday)
    #[arg(long, value_name = "DATE")]
    from: Option<NaiveDate>,

    /// Last day of the retrieval window (YYYY-MM-DD, default yesterday)
    #[arg(long, value_name = "DATE")]
    to: Option<NaiveDate>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without harvesting
    #[arg(long, conflicts_with_all = ["stats", "format_only"])]
    dry_run: bool,

    /// Merge existing harvest slots into the output directory and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    format_only: bool,

    /// Show review totals from the output directory and exit
    #[arg(long, conflicts_with_all = ["dry_run", "format_only"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let reference = Utc::now();
    let yesterday = retrieval_date_for(reference);
    let from = cli.from.unwrap_or(yesterday);
    let to = cli.to.unwrap_or(yesterday);
    anyhow::ensure!(from <= to, "--from {} is after --to {}", from, to);
    let window = RetrievalWindow::new(from, Some(to));

    let locations_path = cli
        .locations
        .clone()
        .unwrap_or_else(|| config.storage.locations_path.clone());

    if cli.dry_run {
        handle_dry_run(&config, &locations_path, window)?;
    } else if cli.format_only {
        handle_format_only(&config, &locations_path, reference)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let inputs = DailyInputs {
            locations_path,
            window,
            reference,
        };
        handle_daily(&config, inputs).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("review_harvest=info,warn"),
            1 => EnvFilter::new("review_harvest=debug,info"),
            2 => EnvFilter::new("review_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be harvested
fn handle_dry_run(
    config: &Config,
    locations_path: &Path,
    window: RetrievalWindow,
) -> anyhow::Result<()> {
    println!("=== Review-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent locations: {}",
        config.crawler.max_concurrent_locations
    );
    println!("  Max attempts per entity: {}", config.crawler.max_retries);
    println!(
        "  Backoff: {}s..{}s",
        config.crawler.backoff_min_secs, config.crawler.backoff_max_secs
    );
    println!("  Skip review size: {}", config.crawler.skip_review_size);
    println!("  First batch only: {}", config.crawler.first_time_check);

    println!("\nStorage:");
    println!("  Work dir: {}", config.storage.work_dir.display());
    println!("  Output dir: {}", config.storage.output_dir.display());

    println!("\nWindow: {}", window);

    let raw_locations = load_locations(locations_path)?;
    let topology = resolve(&raw_locations);

    println!("\nLocations ({}):", topology.locations.len());
    for location in &topology.locations {
        println!(
            "  - {} {} ({} competitors)",
            location.id,
            location.url,
            location.competitors.len()
        );
    }

    println!("\nDuplicate Groups ({}):", topology.duplicate_groups.len());
    for group in &topology.duplicate_groups {
        println!("  - {} <- {:?}", group.canonical, group.duplicates);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would harvest {} locations and {} competitors",
        topology.locations.len(),
        topology.competitor_count()
    );

    Ok(())
}

/// Handles the --format-only mode: merges existing slots into the output directory
fn handle_format_only(
    config: &Config,
    locations_path: &Path,
    reference: DateTime<Utc>,
) -> anyhow::Result<()> {
    let raw_locations = load_locations(locations_path)?;
    let work = FsArtifactStore::new(&config.storage.work_dir);
    let output = FsArtifactStore::new(&config.storage.output_dir);
    let report = aggregate(
        &work,
        &output,
        &raw_locations,
        retrieval_date_for(reference),
    )?;
    println!(
        "✓ Wrote {} files to {} ({} skipped)",
        report.written.len(),
        config.storage.output_dir.display(),
        report.skipped.len()
    );

    print_tally(&tally_names(&report.written));
    Ok(())
}

/// Handles the --stats mode: shows review totals from the output directory
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Output: {}\n", config.storage.output_dir.display());

    let output = FsArtifactStore::new(&config.storage.output_dir);
    print_tally(&tally_records(&output, Path::new(""))?);

    Ok(())
}

/// Handles the main daily run
async fn handle_daily(config: &Config, inputs: DailyInputs) -> anyhow::Result<()> {
    let factory = SnapshotDriverFactory::new(&config.driver, &config.selectors.review_item)?;
    let notifier = notifier_from_config(&config.notify);

    let report = run_daily(config, &inputs, Arc::new(factory), notifier).await?;

    let aborted = report.crawl.aborted().count();
    if aborted > 0 || report.crawl.crashed_tasks > 0 {
        tracing::warn!(
            "{} entities aborted, {} location tasks crashed",
            aborted,
            report.crawl.crashed_tasks
        );
    }
    tracing::info!(
        "Harvested {} records, wrote {} output files",
        report.crawl.total_records(),
        report.formatted.written.len()
    );

    Ok(())
}
