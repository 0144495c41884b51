//! Page driver boundary
//!
//! The harvester never touches a page directly. It drives an implementation
//! of [`PageDriver`], which exposes the small set of DOM primitives a review
//! listing needs:
//! - Navigation and readiness
//! - CSS queries, globally or within a node
//! - Click, scroll-into-view and node removal
//! - Reading text and attributes
//!
//! [`HtmlSnapshotDriver`] is the bundled implementation, replaying static
//! HTML documents loaded from disk or over HTTP.

mod client;
mod snapshot;

pub use client::build_http_client;
pub use snapshot::{HtmlSnapshotDriver, Listing, SnapshotDriverFactory};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a page driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Page not ready after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Node {0} not found")]
    NodeNotFound(NodeHandle),

    #[error("No page is loaded")]
    NotLoaded,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Opaque handle to one element of the current page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub usize);

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// DOM primitives consumed by the harvester
///
/// A driver is exclusively owned by one harvest task for its lifetime.
#[async_trait]
pub trait PageDriver: Send {
    /// Loads `url`, replacing the current page
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Waits until the current page reports ready
    async fn wait_ready(&mut self, timeout: Duration) -> DriverResult<()>;

    /// Returns every live element matching `selector`, in document order
    async fn find(&mut self, selector: &str) -> DriverResult<Vec<NodeHandle>>;

    /// Returns live descendants of `node` matching `selector`
    async fn find_within(
        &mut self,
        node: NodeHandle,
        selector: &str,
    ) -> DriverResult<Vec<NodeHandle>>;

    async fn click(&mut self, node: NodeHandle) -> DriverResult<()>;

    async fn scroll_into_view(&mut self, node: NodeHandle) -> DriverResult<()>;

    /// Removes `node` and its subtree from the live page
    async fn remove(&mut self, node: NodeHandle) -> DriverResult<()>;

    /// Reads the node's text with whitespace collapsed
    async fn read_text(&mut self, node: NodeHandle) -> DriverResult<String>;

    async fn read_attribute(
        &mut self,
        node: NodeHandle,
        name: &str,
    ) -> DriverResult<Option<String>>;

    /// Releases the underlying page resource
    ///
    /// Must be safe to call more than once. The harvester awaits it on every
    /// returned result but not when a harvest panics; a driver holding an
    /// external process also needs a `Drop` guard.
    async fn release(&mut self);
}

/// Creates one page driver per harvest task
#[async_trait]
pub trait DriverFactory: Send + Sync {
    async fn launch(&self) -> DriverResult<Box<dyn PageDriver>>;
}
