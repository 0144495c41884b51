//! Location/competitor topology
//!
//! This module holds the seed data model and resolves it into a canonical
//! work list:
//! - Loading the seed file of locations with nested competitors
//! - Grouping competitors that share a physical address
//! - Mapping every competitor back to its owning location

mod loader;
mod resolver;

pub use loader::{load_locations, parse_locations};
pub use resolver::{normalize_address, resolve, DuplicateGroup, ResolvedTopology};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by locations and competitors
pub type EntityId = u64;

/// A primary reviewed entity, owning zero or more competitors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: EntityId,
    pub url: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub location_type: Option<String>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
}

/// A secondary reviewed entity attached to a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: EntityId,
    pub url: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub name: String,
}

/// Which side of the hierarchy an entity sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Location,
    Competitor,
}

impl EntityKind {
    /// Prefix used in artifact file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Competitor => "competitor",
        }
    }

    /// Parses the artifact file name prefix
    pub fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "location" => Some(Self::Location),
            "competitor" => Some(Self::Competitor),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity of one harvestable entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn location(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Location,
            id,
        }
    }

    pub fn competitor(id: EntityId) -> Self {
        Self {
            kind: EntityKind::Competitor,
            id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}
