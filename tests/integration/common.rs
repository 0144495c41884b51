use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use review_harvest::config::{Config, CrawlerConfig, DriverConfig, HarvesterConfig, StorageConfig};
use review_harvest::driver::{
    DriverError, DriverFactory, DriverResult, NodeHandle, PageDriver, SnapshotDriverFactory,
};
use review_harvest::notify::Notifier;
use std::path::Path;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Reference instant of every test run
pub fn reference() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn item(prefix: &str, index: usize, when: &str) -> String {
    format!(
        r#"<div class="jftiEf" data-review-id="{prefix}-{index}" aria-label="User {index}">
            <button class="WEBjve" data-href="https://maps.example.com/contrib/{index}"></button>
            <div class="RfnDt">Local Guide · {index} reviews</div>
            <span class="kvMYJc" aria-label="4 stars"></span>
            <span class="rsqaWe">{when}</span>
            <span class="wiI7pd">Review {index} of {prefix}</span>
        </div>"#
    )
}

/// A listing page whose items carry the given relative dates, newest first
pub fn listing_page(prefix: &str, dates: &[&str]) -> String {
    let items: String = dates
        .iter()
        .enumerate()
        .map(|(i, when)| item(prefix, i + 1, when))
        .collect();
    format!(
        r#"<html><body>
            <div class="RWPxGd"><button aria-label="Reviews for {prefix}">Reviews</button></div>
            <div class="F7nice"><span aria-label="{count} reviews">{count}</span></div>
            <div class="TrU0dc"><button aria-label="Sort reviews">Sort</button></div>
            <div class="fxNQSd" data-index="1">Newest</div>
            <div class="list">{items}</div>
        </body></html>"#,
        count = dates.len()
    )
}

/// Writes `html` under `dir` and returns its `file://` URL
pub fn write_page(dir: &Path, name: &str, html: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, html).unwrap();
    Url::from_file_path(&path).unwrap().to_string()
}

/// A `file://` URL that does not exist
pub fn missing_page(dir: &Path) -> String {
    Url::from_file_path(dir.join("missing.html"))
        .unwrap()
        .to_string()
}

/// Configuration with no delays, immediate retries and two items per scroll
pub fn test_config(root: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_concurrent_locations: 2,
            max_retries: 3,
            backoff_min_secs: 0,
            backoff_max_secs: 0,
            skip_review_size: 0,
            first_time_check: false,
        },
        harvester: HarvesterConfig {
            waiting_timeout_secs: 1,
            settle_delay_ms: 0,
            pause_min_ms: 0,
            pause_max_ms: 0,
        },
        driver: DriverConfig {
            page_size: Some(2),
            ..DriverConfig::default()
        },
        storage: StorageConfig {
            locations_path: root.join("locations.json"),
            work_dir: root.join("work"),
            output_dir: root.join("output"),
        },
        ..Config::default()
    }
}

/// Notifier keeping every message it receives
#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Snapshot driver factory counting its launches
pub struct CountingFactory {
    inner: SnapshotDriverFactory,
    launches: AtomicU32,
}

impl CountingFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: SnapshotDriverFactory::new(&config.driver, &config.selectors.review_item)
                .unwrap(),
            launches: AtomicU32::new(0),
        }
    }

    pub fn launches(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverFactory for CountingFactory {
    async fn launch(&self) -> DriverResult<Box<dyn PageDriver>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.inner.launch().await
    }
}

#[derive(Default)]
struct DriverCounters {
    live: AtomicUsize,
    peak: AtomicUsize,
    releases: AtomicUsize,
}

/// Snapshot driver factory tracking how many drivers are alive at once
///
/// Drivers can be slowed down on navigation so concurrent harvests overlap,
/// and can be made to fail scrolling on pages whose URL contains a marker.
pub struct TrackingFactory {
    inner: SnapshotDriverFactory,
    counters: Arc<DriverCounters>,
    navigate_delay: Duration,
    fail_scroll_on: Option<String>,
}

impl TrackingFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            inner: SnapshotDriverFactory::new(&config.driver, &config.selectors.review_item)
                .unwrap(),
            counters: Arc::new(DriverCounters::default()),
            navigate_delay: Duration::ZERO,
            fail_scroll_on: None,
        }
    }

    pub fn with_navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = delay;
        self
    }

    pub fn failing_scroll_on(mut self, marker: &str) -> Self {
        self.fail_scroll_on = Some(marker.to_string());
        self
    }

    /// Most drivers alive at the same time
    pub fn peak_live(&self) -> usize {
        self.counters.peak.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverFactory for TrackingFactory {
    async fn launch(&self) -> DriverResult<Box<dyn PageDriver>> {
        let inner = self.inner.launch().await?;
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(live, Ordering::SeqCst);
        Ok(Box::new(TrackedDriver {
            inner,
            counters: self.counters.clone(),
            navigate_delay: self.navigate_delay,
            fail_scroll_on: self.fail_scroll_on.clone(),
            url: String::new(),
        }))
    }
}

struct TrackedDriver {
    inner: Box<dyn PageDriver>,
    counters: Arc<DriverCounters>,
    navigate_delay: Duration,
    fail_scroll_on: Option<String>,
    url: String,
}

impl Drop for TrackedDriver {
    fn drop(&mut self) {
        self.counters.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageDriver for TrackedDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        if !self.navigate_delay.is_zero() {
            tokio::time::sleep(self.navigate_delay).await;
        }
        self.url = url.to_string();
        self.inner.navigate(url).await
    }

    async fn wait_ready(&mut self, timeout: Duration) -> DriverResult<()> {
        self.inner.wait_ready(timeout).await
    }

    async fn find(&mut self, selector: &str) -> DriverResult<Vec<NodeHandle>> {
        self.inner.find(selector).await
    }

    async fn find_within(
        &mut self,
        node: NodeHandle,
        selector: &str,
    ) -> DriverResult<Vec<NodeHandle>> {
        self.inner.find_within(node, selector).await
    }

    async fn click(&mut self, node: NodeHandle) -> DriverResult<()> {
        self.inner.click(node).await
    }

    async fn scroll_into_view(&mut self, node: NodeHandle) -> DriverResult<()> {
        match &self.fail_scroll_on {
            Some(marker) if self.url.contains(marker.as_str()) => Err(DriverError::NotLoaded),
            _ => self.inner.scroll_into_view(node).await,
        }
    }

    async fn remove(&mut self, node: NodeHandle) -> DriverResult<()> {
        self.inner.remove(node).await
    }

    async fn read_text(&mut self, node: NodeHandle) -> DriverResult<String> {
        self.inner.read_text(node).await
    }

    async fn read_attribute(
        &mut self,
        node: NodeHandle,
        name: &str,
    ) -> DriverResult<Option<String>> {
        self.inner.read_attribute(node, name).await
    }

    async fn release(&mut self) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
        self.inner.release().await;
    }
}
