//! Integration tests for the review harvester
//!
//! Listings are saved HTML pages written to a temporary directory and loaded
//! through the snapshot driver with `file://` URLs.

mod common;
mod harvest_tests;
mod notify_tests;
mod pipeline_tests;
