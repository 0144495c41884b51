//! Crawl coordinator - concurrent orchestration of entity harvests
//!
//! This module runs one task per location on a bounded pool:
//! - Harvesting the location with its own retry budget
//! - Harvesting the location's competitors inline, each with its own budget
//! - Reporting entities whose retries are exhausted
//! - Materializing duplicate competitor artifacts once every task finished

use crate::crawler::retry::{attempt, RetryPolicy};
use crate::driver::DriverFactory;
use crate::harvest::{HarvestOutcome, HarvestTarget, Harvester};
use crate::notify::{abort_message, Notifier};
use crate::storage::{slot_dir, slot_path, ArtifactName, ArtifactStore};
use crate::topology::{EntityId, EntityRef, Location, ResolvedTopology};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of one entity after its retry budget
#[derive(Debug, Clone, PartialEq)]
pub enum EntityStatus {
    Harvested { records: usize, attempts: u32 },
    Aborted { attempts: u32, error: String },
}

/// Final status of one harvested entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReport {
    pub entity: EntityRef,
    pub url: String,
    pub status: EntityStatus,
}

impl EntityReport {
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, EntityStatus::Aborted { .. })
    }
}

/// Summary of a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    /// One entry per harvested entity, in completion order
    pub entities: Vec<EntityReport>,

    /// Location tasks that panicked instead of completing
    pub crashed_tasks: usize,

    /// Duplicate artifacts copied into their owners' slots
    pub duplicates_copied: Vec<PathBuf>,

    /// Duplicate ids skipped because the canonical artifact was missing
    pub duplicates_skipped: Vec<EntityId>,
}

impl CrawlReport {
    pub fn harvested(&self) -> usize {
        self.entities.iter().filter(|e| !e.is_aborted()).count()
    }

    pub fn aborted(&self) -> impl Iterator<Item = &EntityReport> {
        self.entities.iter().filter(|e| e.is_aborted())
    }

    pub fn total_records(&self) -> usize {
        self.entities
            .iter()
            .map(|e| match e.status {
                EntityStatus::Harvested { records, .. } => records,
                EntityStatus::Aborted { .. } => 0,
            })
            .sum()
    }

    /// Finds the report for one entity
    pub fn entity(&self, entity: EntityRef) -> Option<&EntityReport> {
        self.entities.iter().find(|e| e.entity == entity)
    }
}

/// Main crawl coordinator structure
///
/// Cheap to clone; every clone shares the same harvester, driver factory,
/// store and notification sink.
#[derive(Clone)]
pub struct Coordinator {
    harvester: Arc<Harvester>,
    factory: Arc<dyn DriverFactory>,
    store: Arc<dyn ArtifactStore>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `harvester` - Per-entity harvester
    /// * `factory` - Launches one page driver per harvest attempt
    /// * `store` - Work-directory store holding the location slots
    /// * `notifier` - Sink for abort notifications
    /// * `retry` - Attempt budget applied to every entity
    /// * `concurrency` - Number of location tasks running at once
    pub fn new(
        harvester: Arc<Harvester>,
        factory: Arc<dyn DriverFactory>,
        store: Arc<dyn ArtifactStore>,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
        concurrency: usize,
    ) -> Self {
        Self {
            harvester,
            factory,
            store,
            notifier,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Harvests every location and competitor of `topology`
    ///
    /// Never fails: exhausted entities are logged, notified and recorded in
    /// the report, and the run carries on. Duplicate competitor artifacts are
    /// materialized after every location task has completed.
    pub async fn run(&self, topology: &ResolvedTopology) -> CrawlReport {
        tracing::info!(
            "Harvesting {} locations and {} competitors, {} at a time",
            topology.locations.len(),
            topology.competitor_count(),
            self.concurrency
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for location in topology.locations.iter().cloned() {
            let semaphore = semaphore.clone();
            let coordinator = self.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                coordinator.run_location(location).await
            });
        }

        let mut report = CrawlReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(entities) => report.entities.extend(entities),
                Err(e) => {
                    tracing::error!("Location task crashed: {}", e);
                    report.crashed_tasks += 1;
                }
            }
        }

        self.materialize_duplicates(topology, &mut report);

        tracing::info!(
            "Crawl finished: {} harvested, {} aborted, {} records",
            report.harvested(),
            report.aborted().count(),
            report.total_records()
        );

        report
    }

    /// One location's full pipeline: its own harvest, then its competitors
    async fn run_location(&self, location: Location) -> Vec<EntityReport> {
        let mut reports = Vec::with_capacity(location.competitors.len() + 1);

        let target = HarvestTarget {
            entity: EntityRef::location(location.id),
            url: location.url.clone(),
            slot: location.id,
        };
        reports.push(self.harvest_entity(&target, true).await);

        for competitor in &location.competitors {
            let target = HarvestTarget {
                entity: EntityRef::competitor(competitor.id),
                url: competitor.url.clone(),
                slot: location.id,
            };
            reports.push(self.harvest_entity(&target, false).await);
        }

        reports
    }

    /// Harvests one entity with the retry policy, notifying on abort
    async fn harvest_entity(&self, target: &HarvestTarget, reset_slot: bool) -> EntityReport {
        let label = target.entity.to_string();
        let result = attempt(&self.retry, &label, |_| self.attempt_entity(target, reset_slot)).await;

        let status = match result {
            Ok(done) => EntityStatus::Harvested {
                records: done.value.records.len(),
                attempts: done.attempts,
            },
            Err(exhausted) => {
                tracing::error!(
                    "{}: aborting after {} attempts: {}",
                    target.entity,
                    exhausted.attempts,
                    exhausted.last_error
                );
                self.notifier
                    .notify(&abort_message(target.entity.id, &target.url))
                    .await;
                self.discard_provisional(target);
                EntityStatus::Aborted {
                    attempts: exhausted.attempts,
                    error: exhausted.last_error.to_string(),
                }
            }
        };

        EntityReport {
            entity: target.entity,
            url: target.url.clone(),
            status,
        }
    }

    /// One attempt; a location attempt starts from an empty slot
    ///
    /// A competitor attempt only drops its own provisional artifact, since the
    /// slot already holds artifacts of its location and siblings.
    async fn attempt_entity(&self, target: &HarvestTarget, reset_slot: bool) -> Result<HarvestOutcome> {
        if reset_slot {
            self.store.reset_dir(&slot_dir(target.slot))?;
        } else {
            self.store.remove(&provisional_path(target))?;
        }
        self.harvester.harvest(self.factory.as_ref(), target).await
    }

    /// Deletes the partial artifact an aborted entity left behind
    fn discard_provisional(&self, target: &HarvestTarget) {
        if let Err(e) = self.store.remove(&provisional_path(target)) {
            tracing::warn!("{}: cannot remove partial artifact: {}", target.entity, e);
        }
    }

    /// Copies each canonical competitor artifact under its duplicates' ids
    ///
    /// Each copy lands in the duplicate's own owning-location slot. A missing
    /// canonical artifact skips the whole group with a warning.
    fn materialize_duplicates(&self, topology: &ResolvedTopology, report: &mut CrawlReport) {
        for group in &topology.duplicate_groups {
            let canonical = EntityRef::competitor(group.canonical);
            let source = topology
                .competitor_owner
                .get(&group.canonical)
                .and_then(|&owner| self.find_committed(owner, canonical));

            let Some((source_path, source_name)) = source else {
                tracing::warn!(
                    "No artifact for {}, skipping duplicates {:?}",
                    canonical,
                    group.duplicates
                );
                report.duplicates_skipped.extend(&group.duplicates);
                continue;
            };

            for &duplicate in &group.duplicates {
                let Some(&owner) = topology.competitor_owner.get(&duplicate) else {
                    tracing::warn!("Competitor {} has no owning location", duplicate);
                    report.duplicates_skipped.push(duplicate);
                    continue;
                };

                let target = slot_path(owner, &source_name.with_id(duplicate));
                match self.store.copy(&source_path, &target) {
                    Ok(()) => {
                        tracing::info!(
                            "Copied {} to {}",
                            source_path.display(),
                            target.display()
                        );
                        report.duplicates_copied.push(target);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to copy {} for {}: {}", canonical, duplicate, e);
                        report.duplicates_skipped.push(duplicate);
                    }
                }
            }
        }
    }

    /// Finds the committed artifact of `entity` in a location slot
    fn find_committed(
        &self,
        slot: EntityId,
        entity: EntityRef,
    ) -> Option<(PathBuf, ArtifactName)> {
        let files = match self.store.list(&slot_dir(slot)) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!("Cannot list slot {}: {}", slot, e);
                return None;
            }
        };

        files.into_iter().find_map(|path| {
            let name = ArtifactName::from_path(&path)?;
            (name.entity() == entity && name.is_committed() && name.stamp.is_none())
                .then_some((path, name))
        })
    }
}

fn provisional_path(target: &HarvestTarget) -> PathBuf {
    slot_path(target.slot, &ArtifactName::provisional(target.entity))
}
