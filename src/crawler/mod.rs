//! Crawler module for orchestrating review harvests
//!
//! This module contains the run-level logic, including:
//! - Bounded retry with randomized backoff
//! - Concurrent per-location harvesting with inline competitors
//! - Duplicate competitor materialization
//! - The daily pipeline tying crawl, formatting and tallies together

mod coordinator;
mod daily;
mod retry;

pub use coordinator::{Coordinator, CrawlReport, EntityReport, EntityStatus};
pub use daily::{format_duration, run_daily, DailyInputs, DailyReport};
pub use retry::{attempt, Attempted, Exhausted, RetryPolicy};
