//! Output module for merged review artifacts and run summaries
//!
//! This module handles:
//! - Merging entity metadata into harvested records
//! - Writing date-stamped per-entity outputs
//! - Tallying record counts per entity kind

mod formatter;
pub mod stats;

pub use formatter::{aggregate, AggregateReport, MetadataIndex};
pub use stats::{print_tally, tally_names, tally_records, RecordTally};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("No metadata for {0}")]
    UnknownEntity(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
