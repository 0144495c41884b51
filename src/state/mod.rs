//! State module for tracking harvest progress
//!
//! This module provides the state machine that one entity's harvest walks
//! through, from navigation to the terminal outcome.
//!
//! # Components
//!
//! - `HarvestState`: the ordered states of a single harvest
//! - `StopReason`: why the extraction loop ended

mod harvest_state;

// Re-export main types
pub use harvest_state::{HarvestState, StopReason};
