//! Page harvester
//!
//! Harvests one entity (location or competitor) end to end: navigates to its
//! listing, opens and sorts the reviews, then scrolls through the lazily
//! loaded items extracting every review inside the retrieval window.
//!
//! # Components
//!
//! - `Harvester`: the per-entity state machine
//! - `HarvestedRecord`: one extracted review
//! - `RetrievalWindow`: the inclusive date range a run keeps

mod extract;
mod harvester;
mod record;

pub use harvester::Harvester;
pub use record::{retrieval_date_for, HarvestedRecord, RetrievalWindow, ReviewDate};

use crate::state::StopReason;
use crate::topology::{EntityId, EntityRef};
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

/// Run-wide harvesting parameters
#[derive(Debug, Clone)]
pub struct HarvestOptions {
    pub window: RetrievalWindow,

    /// Items at the head of each listing passed over without extraction
    pub skip_review_size: usize,

    /// Stop after the first processed batch
    pub first_time_check: bool,

    /// Instant relative review times are resolved against
    pub reference: DateTime<Utc>,

    /// Date stamped on every record
    pub retrieval_date: NaiveDate,
}

impl HarvestOptions {
    /// Builds options for a run anchored at `reference`
    ///
    /// The retrieval date is the day before `reference`.
    pub fn new(
        window: RetrievalWindow,
        skip_review_size: usize,
        first_time_check: bool,
        reference: DateTime<Utc>,
    ) -> Self {
        Self {
            window,
            skip_review_size,
            first_time_check,
            reference,
            retrieval_date: retrieval_date_for(reference),
        }
    }
}

/// What to harvest and where its artifact goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestTarget {
    pub entity: EntityRef,
    pub url: String,

    /// Location id whose slot directory receives the artifact
    pub slot: EntityId,
}

/// Result of one successful harvest
#[derive(Debug, Clone)]
pub struct HarvestOutcome {
    pub entity: EntityRef,
    pub records: Vec<HarvestedRecord>,
    pub categories: Vec<String>,
    pub total_reviews: Option<String>,

    /// Committed artifact path, absent when nothing was extracted
    pub artifact: Option<PathBuf>,
    pub stop_reason: StopReason,
}
