//! Review-Harvest: an incremental review harvesting engine
//!
//! This crate harvests time-windowed review records for a set of locations and
//! their competitors from a paginated, lazily-loaded listing, deduplicates
//! competitors that share an address, and emits per-entity JSON artifacts for
//! downstream aggregation.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod harvest;
pub mod notify;
pub mod output;
pub mod state;
pub mod storage;
pub mod time;
pub mod topology;

use thiserror::Error;

/// Main error type for a single entity's harvest attempt
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Failed to navigate to {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Page {url} was not ready after {timeout_secs}s")]
    LoadTimeout { url: String, timeout_secs: u64 },

    #[error("Reviews tab not found for {entity}")]
    ReviewsTabNotFound { entity: String },

    #[error("Required element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Unsupported time format: {0}")]
    UnsupportedTimeFormat(#[from] time::TimeError),

    #[error("Artifact write error: {0}")]
    ArtifactWrite(#[from] storage::StorageError),

    #[error("Page driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: state::HarvestState,
        to: state::HarvestState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while loading the seed topology
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Failed to read locations file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse locations file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL for {entity}: {message}")]
    InvalidUrl { entity: String, message: String },
}

/// Errors that stop a whole daily run before or after the crawl
///
/// Per-entity failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Result type alias for harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for topology loading
pub type TopologyResult<T> = std::result::Result<T, TopologyError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_daily, Coordinator, CrawlReport, DailyInputs, DailyReport};
pub use harvest::{HarvestedRecord, Harvester, RetrievalWindow};
pub use state::HarvestState;
pub use time::normalize;
pub use topology::{resolve, Competitor, EntityKind, Location, ResolvedTopology};
