//! Static HTML page driver
//!
//! Replays a saved listing page. Elements are addressed by their ordinal in
//! document order, so handles stay valid for as long as the page is loaded.
//! Removing a node hides it and its subtree from every later query, which is
//! how consumed review batches disappear from the live listing.

use crate::config::DriverConfig;
use crate::driver::client::build_http_client;
use crate::driver::{DriverError, DriverFactory, DriverResult, NodeHandle, PageDriver};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Lazily materialized listing emulation
///
/// Global queries for `selector` return at most `page_size` live matches, so
/// each removed batch reveals the next one the way scrolling does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub selector: String,
    pub page_size: usize,
}

/// Page driver over a static HTML document
#[derive(Debug)]
pub struct HtmlSnapshotDriver {
    client: Option<Client>,
    document: Option<String>,
    pinned: bool,
    listing: Option<Listing>,
    removed: HashSet<usize>,
}

impl HtmlSnapshotDriver {
    /// Creates a driver that loads pages with `client`
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
            document: None,
            pinned: false,
            listing: None,
            removed: HashSet::new(),
        }
    }

    /// Creates a driver over an in-memory document
    ///
    /// Navigation is accepted for any URL and keeps this document.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self {
            client: None,
            document: Some(html.into()),
            pinned: true,
            listing: None,
            removed: HashSet::new(),
        }
    }

    pub fn with_listing(mut self, listing: Listing) -> Self {
        self.listing = Some(listing);
        self
    }

    /// Parses the current document and runs `f` against it
    ///
    /// Every call re-parses, since `Html` is `!Send` and cannot be kept in a
    /// driver that crosses await points on a multi-threaded runtime.
    fn on_page<R>(&self, f: impl FnOnce(&Page<'_>) -> DriverResult<R>) -> DriverResult<R> {
        let source = self.document.as_deref().ok_or(DriverError::NotLoaded)?;
        let html = Html::parse_document(source);
        let page = Page::build(&html, &self.removed);
        f(&page)
    }

    async fn fetch(&self, url: &str) -> DriverResult<String> {
        let parsed = Url::parse(url).map_err(|e| DriverError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        match parsed.scheme() {
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|_| DriverError::Navigation {
                        url: url.to_string(),
                        message: "not a local file path".to_string(),
                    })?;
                Ok(tokio::fs::read_to_string(path).await?)
            }
            "http" | "https" => {
                let client = self.client.as_ref().ok_or_else(|| DriverError::Navigation {
                    url: url.to_string(),
                    message: "driver has no HTTP client".to_string(),
                })?;

                let response = client.get(parsed).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(DriverError::Navigation {
                        url: url.to_string(),
                        message: format!("HTTP {}", status),
                    });
                }
                Ok(response.text().await?)
            }
            other => Err(DriverError::Navigation {
                url: url.to_string(),
                message: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

fn parse_selector(selector: &str) -> DriverResult<Selector> {
    Selector::parse(selector).map_err(|e| DriverError::InvalidSelector {
        selector: selector.to_string(),
        message: format!("{:?}", e),
    })
}

/// One parse of the current document with liveness resolved
struct Page<'a> {
    elements: Vec<ElementRef<'a>>,
    live: Vec<bool>,
}

impl<'a> Page<'a> {
    fn build(html: &'a Html, removed: &HashSet<usize>) -> Self {
        let elements: Vec<ElementRef<'a>> = html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();

        let removed_ids: HashSet<_> = removed
            .iter()
            .filter_map(|&ordinal| elements.get(ordinal))
            .map(|element| element.id())
            .collect();

        let live = elements
            .iter()
            .map(|element| {
                !removed_ids.contains(&element.id())
                    && !element.ancestors().any(|a| removed_ids.contains(&a.id()))
            })
            .collect();

        Self { elements, live }
    }

    fn element(&self, node: NodeHandle) -> DriverResult<ElementRef<'a>> {
        match (self.elements.get(node.0), self.live.get(node.0)) {
            (Some(element), Some(true)) => Ok(*element),
            _ => Err(DriverError::NodeNotFound(node)),
        }
    }

    fn select(&self, selector: &Selector, scope: Option<NodeHandle>) -> DriverResult<Vec<NodeHandle>> {
        let root = scope.map(|node| self.element(node)).transpose()?;
        let start = scope.map_or(0, |node| node.0 + 1);

        let matches = self
            .elements
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(ordinal, _)| self.live[*ordinal])
            .filter(|(_, element)| match &root {
                Some(root) => element.ancestors().any(|a| a.id() == root.id()),
                None => true,
            })
            .filter(|(_, element)| selector.matches(element))
            .map(|(ordinal, _)| NodeHandle(ordinal))
            .collect();

        Ok(matches)
    }
}

#[async_trait]
impl PageDriver for HtmlSnapshotDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.removed.clear();
        if self.pinned {
            return Ok(());
        }

        self.document = None;
        let body = self.fetch(url).await?;
        tracing::debug!("Loaded {} ({} bytes)", url, body.len());
        self.document = Some(body);
        Ok(())
    }

    async fn wait_ready(&mut self, timeout: Duration) -> DriverResult<()> {
        if self.document.is_some() {
            Ok(())
        } else {
            Err(DriverError::Timeout {
                timeout_secs: timeout.as_secs(),
            })
        }
    }

    async fn find(&mut self, selector: &str) -> DriverResult<Vec<NodeHandle>> {
        let parsed = parse_selector(selector)?;
        let mut nodes = self.on_page(|page| page.select(&parsed, None))?;

        if let Some(listing) = &self.listing {
            if listing.selector == selector {
                nodes.truncate(listing.page_size);
            }
        }

        Ok(nodes)
    }

    async fn find_within(
        &mut self,
        node: NodeHandle,
        selector: &str,
    ) -> DriverResult<Vec<NodeHandle>> {
        let parsed = parse_selector(selector)?;
        self.on_page(|page| page.select(&parsed, Some(node)))
    }

    async fn click(&mut self, node: NodeHandle) -> DriverResult<()> {
        self.on_page(|page| page.element(node).map(|_| ()))
    }

    async fn scroll_into_view(&mut self, node: NodeHandle) -> DriverResult<()> {
        self.on_page(|page| page.element(node).map(|_| ()))
    }

    async fn remove(&mut self, node: NodeHandle) -> DriverResult<()> {
        self.on_page(|page| page.element(node).map(|_| ()))?;
        self.removed.insert(node.0);
        Ok(())
    }

    async fn read_text(&mut self, node: NodeHandle) -> DriverResult<String> {
        self.on_page(|page| {
            let element = page.element(node)?;
            let text: Vec<&str> = element.text().flat_map(str::split_whitespace).collect();
            Ok(text.join(" "))
        })
    }

    async fn read_attribute(
        &mut self,
        node: NodeHandle,
        name: &str,
    ) -> DriverResult<Option<String>> {
        self.on_page(|page| {
            let element = page.element(node)?;
            Ok(element.value().attr(name).map(str::to_string))
        })
    }

    async fn release(&mut self) {
        self.document = None;
        self.removed.clear();
    }
}

/// Launches [`HtmlSnapshotDriver`]s sharing one HTTP client
#[derive(Debug, Clone)]
pub struct SnapshotDriverFactory {
    client: Client,
    listing: Option<Listing>,
}

impl SnapshotDriverFactory {
    /// Creates a factory from driver settings
    ///
    /// # Arguments
    ///
    /// * `config` - Driver settings (user agent, timeout, page size)
    /// * `review_item_selector` - Selector of listing items, paginated by `page-size`
    pub fn new(config: &DriverConfig, review_item_selector: &str) -> DriverResult<Self> {
        let client = build_http_client(config)?;
        let listing = config.page_size.map(|page_size| Listing {
            selector: review_item_selector.to_string(),
            page_size,
        });

        Ok(Self { client, listing })
    }
}

#[async_trait]
impl DriverFactory for SnapshotDriverFactory {
    async fn launch(&self) -> DriverResult<Box<dyn PageDriver>> {
        let mut driver = HtmlSnapshotDriver::new(self.client.clone());
        if let Some(listing) = &self.listing {
            driver = driver.with_listing(listing.clone());
        }
        Ok(Box::new(driver))
    }
}
