use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Review-Harvest
///
/// Every section is optional; omitted keys fall back to the values a daily
/// production run uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub harvester: HarvesterConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// Crawl orchestration configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Number of locations harvested in parallel
    pub max_concurrent_locations: u32,

    /// Total attempts per entity, including the first
    pub max_retries: u32,

    /// Lower bound of the randomized sleep between attempts (seconds)
    pub backoff_min_secs: u64,

    /// Upper bound of the randomized sleep between attempts (seconds)
    pub backoff_max_secs: u64,

    /// Items at the head of each listing to scroll past without extracting
    pub skip_review_size: usize,

    /// Harvest only the first batch of each listing
    pub first_time_check: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_locations: 4,
            max_retries: 3,
            backoff_min_secs: 55,
            backoff_max_secs: 75,
            skip_review_size: 0,
            first_time_check: true,
        }
    }
}

/// Per-entity harvester timing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HarvesterConfig {
    /// Budget for the page to report ready (seconds)
    pub waiting_timeout_secs: u64,

    /// Pause after each scroll for new items to load (milliseconds)
    pub settle_delay_ms: u64,

    /// Lower bound of the short pause after clicks (milliseconds)
    pub pause_min_ms: u64,

    /// Upper bound of the short pause after clicks (milliseconds)
    pub pause_max_ms: u64,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            waiting_timeout_secs: 50,
            settle_delay_ms: 5000,
            pause_min_ms: 3000,
            pause_max_ms: 5000,
        }
    }
}

impl HarvesterConfig {
    pub fn waiting_timeout(&self) -> Duration {
        Duration::from_secs(self.waiting_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// CSS selectors used to navigate and read a review listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SelectorConfig {
    pub reviews_tab: String,
    pub total_reviews: String,
    pub sort_button: String,
    pub newest_option: String,
    pub refine_categories: String,
    pub category_label: String,
    pub review_item: String,
    pub more_button: String,
    pub description: String,
    pub review_date: String,
    pub rating: String,
    pub reviewer_count: String,
    pub reviewer_url: String,
    pub owner_reply: String,
    pub owner_reply_date: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            reviews_tab: "div.RWPxGd button[aria-label*='Reviews']".to_string(),
            total_reviews: "div.F7nice span[aria-label*='reviews']".to_string(),
            sort_button: "div.TrU0dc button[aria-label*='Sort']".to_string(),
            newest_option: "div.fxNQSd[data-index='1']".to_string(),
            refine_categories: "div[aria-label='Refine reviews'] button[role='radio']"
                .to_string(),
            category_label: "span.uEubGf".to_string(),
            review_item: "div.jftiEf".to_string(),
            more_button: "button.w8nwRe".to_string(),
            description: "span.wiI7pd".to_string(),
            review_date: "span.rsqaWe".to_string(),
            rating: "span.kvMYJc".to_string(),
            reviewer_count: "div.RfnDt".to_string(),
            reviewer_url: "button.WEBjve".to_string(),
            owner_reply: "div.wiI7pd".to_string(),
            owner_reply_date: "span.DZSIDd".to_string(),
        }
    }
}

/// Snapshot page driver configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DriverConfig {
    /// User agent sent when fetching http(s) pages
    pub user_agent: String,

    /// Timeout for a single page fetch (seconds)
    pub request_timeout_secs: u64,

    /// Review items materialized per scroll; unset materializes all at once
    pub page_size: Option<usize>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("ReviewHarvest/{}", env!("CARGO_PKG_VERSION")),
            request_timeout_secs: 30,
            page_size: Some(10),
        }
    }
}

/// Input and output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    /// JSON seed file of locations with nested competitors
    pub locations_path: PathBuf,

    /// Root of the per-location harvest slots
    pub work_dir: PathBuf,

    /// Directory receiving merged, date-stamped outputs
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            locations_path: PathBuf::from("./locations.json"),
            work_dir: PathBuf::from("./work"),
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// Deployment environment, controlling where notifications go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

/// Outbound notification configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct NotifyConfig {
    /// Incoming webhook URL; notifications are only logged when unset
    pub webhook_url: Option<String>,

    /// Channel override sent with each message
    pub channel: Option<String>,

    pub environment: Environment,
}
