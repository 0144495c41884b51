//! Per-entity harvest state machine
//!
//! A harvest walks `Init → Loaded → ReviewsTabOpen → Sorted →
//! CategoriesDiscovered → Scrolling → Draining → Succeeded`, moving to
//! `Failed` from any active state on error. The extraction loop reads the
//! currently materialized batch of items, extracts the in-window ones,
//! persists the provisional artifact, then scrolls and removes the batch so
//! the next read only sees newly revealed items.

use crate::config::{HarvesterConfig, SelectorConfig};
use crate::driver::{DriverError, DriverFactory, NodeHandle, PageDriver};
use crate::harvest::extract::{extract_item, ItemOutcome};
use crate::harvest::{HarvestOptions, HarvestOutcome, HarvestTarget, HarvestedRecord};
use crate::state::{HarvestState, StopReason};
use crate::storage::{slot_path, write_json, ArtifactName, ArtifactStore};
use crate::{HarvestError, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Harvests one entity's review listing into an artifact
///
/// A `Harvester` is immutable and shared by every task of a run.
#[derive(Clone)]
pub struct Harvester {
    config: HarvesterConfig,
    selectors: SelectorConfig,
    options: HarvestOptions,
    store: Arc<dyn ArtifactStore>,
}

impl Harvester {
    /// Creates a new harvester
    ///
    /// # Arguments
    ///
    /// * `config` - Timing settings
    /// * `selectors` - Page selectors
    /// * `options` - Window, skip count, shallow mode and reference instant
    /// * `store` - Store receiving artifacts, rooted at the work directory
    pub fn new(
        config: HarvesterConfig,
        selectors: SelectorConfig,
        options: HarvestOptions,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            selectors,
            options,
            store,
        }
    }

    pub fn options(&self) -> &HarvestOptions {
        &self.options
    }

    /// Harvests `target` with a freshly launched driver
    ///
    /// The driver is released before any result, success or error, is
    /// returned. A panic inside the harvest skips the release.
    pub async fn harvest(
        &self,
        factory: &dyn DriverFactory,
        target: &HarvestTarget,
    ) -> Result<HarvestOutcome> {
        let mut driver = factory.launch().await?;
        let result = self.harvest_with(driver.as_mut(), target).await;
        driver.release().await;
        result
    }

    /// Harvests `target` with a driver owned by the caller
    ///
    /// The driver is not released.
    pub async fn harvest_with(
        &self,
        driver: &mut dyn PageDriver,
        target: &HarvestTarget,
    ) -> Result<HarvestOutcome> {
        let mut session = Session {
            harvester: self,
            driver,
            target,
            state: HarvestState::Init,
        };

        let result = session.run().await;
        if let Err(e) = &result {
            session.fail(e);
        }
        result
    }

    /// Sleeps for a random duration within the configured pause range
    async fn pause(&self) {
        let (min, max) = (self.config.pause_min_ms, self.config.pause_max_ms);
        if max == 0 {
            return;
        }
        let millis = rand::rng().random_range(min..=max);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    async fn settle(&self) {
        let delay = self.config.settle_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// One in-flight harvest: the driver, the target and the current state
struct Session<'a> {
    harvester: &'a Harvester,
    driver: &'a mut dyn PageDriver,
    target: &'a HarvestTarget,
    state: HarvestState,
}

impl Session<'_> {
    fn transition(&mut self, next: HarvestState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }

        tracing::trace!("{}: {} -> {}", self.target.entity, self.state, next);
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, error: &HarvestError) {
        tracing::debug!(
            "{}: failed in state {}: {}",
            self.target.entity,
            self.state,
            error
        );
        if self.state.can_transition_to(HarvestState::Failed) {
            self.state = HarvestState::Failed;
        }
    }

    async fn run(&mut self) -> Result<HarvestOutcome> {
        self.load().await?;
        let total_reviews = self.open_reviews_tab().await?;
        self.sort_newest_first().await?;
        let categories = self.discover_categories().await?;

        let (records, stop_reason) = self.extract_all().await?;

        self.transition(HarvestState::Draining)?;
        let artifact = self.commit(records.len())?;
        self.transition(HarvestState::Succeeded)?;

        tracing::info!(
            "{}: harvested {} reviews ({})",
            self.target.entity,
            records.len(),
            stop_reason
        );

        Ok(HarvestOutcome {
            entity: self.target.entity,
            records,
            categories,
            total_reviews,
            artifact,
            stop_reason,
        })
    }

    async fn load(&mut self) -> Result<()> {
        let url = self.target.url.clone();

        self.driver
            .navigate(&url)
            .await
            .map_err(|e| HarvestError::Navigation {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let timeout = self.harvester.config.waiting_timeout();
        match self.driver.wait_ready(timeout).await {
            Ok(()) => {}
            Err(DriverError::Timeout { timeout_secs }) => {
                return Err(HarvestError::LoadTimeout { url, timeout_secs })
            }
            Err(e) => return Err(e.into()),
        }

        self.transition(HarvestState::Loaded)
    }

    async fn open_reviews_tab(&mut self) -> Result<Option<String>> {
        let harvester = self.harvester;
        let selectors = &harvester.selectors;

        let tab = self
            .driver
            .find(&selectors.reviews_tab)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HarvestError::ReviewsTabNotFound {
                entity: self.target.entity.to_string(),
            })?;

        self.driver.click(tab).await?;
        harvester.pause().await;

        let total_reviews = match self.driver.find(&selectors.total_reviews).await?.first() {
            Some(&label) => match self.driver.read_attribute(label, "aria-label").await? {
                Some(text) => Some(text),
                None => Some(self.driver.read_text(label).await?),
            },
            None => None,
        };

        if let Some(total) = &total_reviews {
            tracing::info!("{}: {}", self.target.entity, total);
        }

        self.transition(HarvestState::ReviewsTabOpen)?;
        Ok(total_reviews)
    }

    async fn sort_newest_first(&mut self) -> Result<()> {
        let harvester = self.harvester;

        let sort = self.required(&harvester.selectors.sort_button).await?;
        self.driver.click(sort).await?;
        harvester.pause().await;

        let newest = self.required(&harvester.selectors.newest_option).await?;
        self.driver.click(newest).await?;
        harvester.pause().await;

        self.transition(HarvestState::Sorted)
    }

    async fn discover_categories(&mut self) -> Result<Vec<String>> {
        let harvester = self.harvester;
        let selectors = &harvester.selectors;
        let mut categories = Vec::new();

        for button in self.driver.find(&selectors.refine_categories).await? {
            let label = match self
                .driver
                .find_within(button, &selectors.category_label)
                .await?
                .first()
            {
                Some(&span) => self.driver.read_text(span).await?,
                None => self.driver.read_text(button).await?,
            };

            if !label.is_empty() {
                categories.push(label);
            }
        }

        tracing::debug!("{}: categories {:?}", self.target.entity, categories);
        self.transition(HarvestState::CategoriesDiscovered)?;
        Ok(categories)
    }

    /// Runs the scroll/extract loop until the listing or window is exhausted
    async fn extract_all(&mut self) -> Result<(Vec<HarvestedRecord>, StopReason)> {
        let harvester = self.harvester;
        let options = &harvester.options;
        let item_selector = &harvester.selectors.review_item;
        let provisional = slot_path(
            self.target.slot,
            &ArtifactName::provisional(self.target.entity),
        );

        let mut records: Vec<HarvestedRecord> = Vec::new();
        let mut skipped = 0usize;

        self.transition(HarvestState::Scrolling)?;

        let stop_reason = loop {
            let batch = self.driver.find(item_selector).await?;
            if batch.is_empty() {
                break StopReason::NoMoreItems;
            }

            let to_skip = options.skip_review_size.saturating_sub(skipped).min(batch.len());
            skipped += to_skip;

            if to_skip == batch.len() {
                tracing::debug!(
                    "{}: skipping batch of {} ({} of {} skipped)",
                    self.target.entity,
                    batch.len(),
                    skipped,
                    options.skip_review_size
                );
                self.advance(&batch).await?;
                self.transition(HarvestState::Scrolling)?;
                continue;
            }

            let before = records.len();
            let mut exhausted = false;

            for &item in &batch[to_skip..] {
                match extract_item(&mut *self.driver, item, &harvester.selectors, options).await {
                    Ok(ItemOutcome::Record(record)) => records.push(*record),
                    Ok(ItemOutcome::AfterWindow) => {}
                    Ok(ItemOutcome::BeforeWindow) => {
                        exhausted = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!("{}: skipping item {}: {}", self.target.entity, item, e)
                    }
                }
            }

            if records.len() > before {
                write_json(harvester.store.as_ref(), &provisional, &records)?;
                tracing::debug!(
                    "{}: saved {} reviews to {}",
                    self.target.entity,
                    records.len(),
                    provisional.display()
                );
            }

            if exhausted {
                break StopReason::WindowExhausted;
            }
            if options.first_time_check {
                break StopReason::FirstBatchOnly;
            }

            self.advance(&batch).await?;
            self.transition(HarvestState::Scrolling)?;
        };

        Ok((records, stop_reason))
    }

    /// Scrolls past `batch`, drops it from the live listing and lets the page settle
    async fn advance(&mut self, batch: &[NodeHandle]) -> Result<()> {
        if let Some(&last) = batch.last() {
            self.driver.scroll_into_view(last).await?;
        }
        for &node in batch {
            self.driver.remove(node).await?;
        }
        self.harvester.settle().await;
        Ok(())
    }

    /// Renames the provisional artifact to its final, counted name
    fn commit(&self, count: usize) -> Result<Option<std::path::PathBuf>> {
        if count == 0 {
            return Ok(None);
        }

        let entity = self.target.entity;
        let provisional = slot_path(self.target.slot, &ArtifactName::provisional(entity));
        let committed = slot_path(self.target.slot, &ArtifactName::committed(entity, count));

        self.harvester.store.rename(&provisional, &committed)?;
        Ok(Some(committed))
    }

    async fn required(&mut self, selector: &str) -> Result<NodeHandle> {
        self.driver
            .find(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| HarvestError::ElementNotFound {
                selector: selector.to_string(),
            })
    }
}
