//! Relative time normalization
//!
//! Review listings render timestamps as human-relative text ("3 weeks ago",
//! "Edited a year ago"). This module converts them into absolute instants
//! against a caller-supplied reference instant.

mod normalize;

pub use normalize::{normalize, TimeUnit};

use thiserror::Error;

/// Errors produced by the relative time normalizer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("Unsupported review time format: {0:?}")]
    UnsupportedFormat(String),

    #[error("Relative time {0:?} is out of the representable range")]
    OutOfRange(String),
}

/// Result type for time normalization
pub type TimeResult<T> = Result<T, TimeError>;
