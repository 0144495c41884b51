//! The daily harvesting pipeline
//!
//! Crawl, format, tally, and report each stage through the notifier.

use crate::config::Config;
use crate::crawler::coordinator::{CrawlReport, Coordinator};
use crate::crawler::retry::RetryPolicy;
use crate::driver::DriverFactory;
use crate::harvest::{HarvestOptions, Harvester, RetrievalWindow};
use crate::notify::Notifier;
use crate::output::{aggregate, tally_names, AggregateReport, RecordTally};
use crate::storage::{ArtifactStore, FsArtifactStore};
use crate::topology::{load_locations, resolve};
use crate::PipelineError;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-run inputs that are not part of the configuration file
#[derive(Debug, Clone)]
pub struct DailyInputs {
    pub locations_path: PathBuf,
    pub window: RetrievalWindow,

    /// Instant relative review times resolve against
    pub reference: DateTime<Utc>,
}

/// Everything a daily run produced
#[derive(Debug, Clone)]
pub struct DailyReport {
    pub crawl: CrawlReport,
    pub formatted: AggregateReport,
    pub tally: RecordTally,
    pub duration: Duration,
}

/// Formats a duration as `HH:MM:SS`
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}

async fn log_and_notify(notifier: &dyn Notifier, message: &str) {
    tracing::info!("{}", message);
    notifier.notify(&format!("🔄: {}", message)).await;
}

/// Runs the full daily pipeline
///
/// # Stages
///
/// 1. Load and resolve the seed topology
/// 2. Crawl every location and competitor, then materialize duplicates
/// 3. Merge metadata into every artifact, stamped with the retrieval date
/// 4. Tally record counts per entity kind over the files this run wrote
/// 5. Report the total duration
///
/// # Arguments
///
/// * `config` - The run configuration
/// * `inputs` - Seed file, window and reference instant
/// * `factory` - Page driver factory
/// * `notifier` - Sink for progress and abort messages
///
/// # Returns
///
/// * `Ok(DailyReport)` - The run completed, whatever individual entities did
/// * `Err(PipelineError)` - The seed file or the work directory was unusable
pub async fn run_daily(
    config: &Config,
    inputs: &DailyInputs,
    factory: Arc<dyn DriverFactory>,
    notifier: Arc<dyn Notifier>,
) -> Result<DailyReport, PipelineError> {
    let started = Instant::now();
    log_and_notify(notifier.as_ref(), "Starting reviews daily scraper").await;

    let raw_locations = load_locations(&inputs.locations_path)?;
    let topology = resolve(&raw_locations);
    tracing::info!(
        "Resolved {} locations, {} duplicate groups, window {}",
        topology.locations.len(),
        topology.duplicate_groups.len(),
        inputs.window
    );

    let work: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.storage.work_dir));
    let output = FsArtifactStore::new(&config.storage.output_dir);

    let options = HarvestOptions::new(
        inputs.window,
        config.crawler.skip_review_size,
        config.crawler.first_time_check,
        inputs.reference,
    );
    let retrieval_date = options.retrieval_date;

    let harvester = Harvester::new(
        config.harvester.clone(),
        config.selectors.clone(),
        options,
        work.clone(),
    );
    let coordinator = Coordinator::new(
        Arc::new(harvester),
        factory,
        work.clone(),
        notifier.clone(),
        RetryPolicy::from_config(&config.crawler),
        config.crawler.max_concurrent_locations as usize,
    );

    let crawl = coordinator.run(&topology).await;
    log_and_notify(notifier.as_ref(), "Done reviews daily scraper").await;

    log_and_notify(notifier.as_ref(), "Starting reviews formatter").await;
    let formatted = aggregate(work.as_ref(), &output, &raw_locations, retrieval_date)?;
    log_and_notify(notifier.as_ref(), "Done reviews formatter").await;

    let tally = tally_names(&formatted.written);
    for line in tally.notification_lines() {
        tracing::info!("{}", line);
        notifier.notify(&line).await;
    }

    let duration = started.elapsed();
    log_and_notify(
        notifier.as_ref(),
        &format!("Total duration: {}", format_duration(duration)),
    )
    .await;

    Ok(DailyReport {
        crawl,
        formatted,
        tally,
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_duration(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "25:01:01");
    }
}
