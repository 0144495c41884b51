//! Storage module for persisting harvest artifacts
//!
//! This module handles all artifact persistence for the harvester, including:
//! - The artifact store interface and its filesystem implementation
//! - Artifact file naming (provisional, committed and date-stamped names)
//! - Per-location slot directories
//! - JSON encoding of record collections

mod fs;
mod traits;

pub use fs::FsArtifactStore;
pub use traits::{ArtifactStore, StorageError, StorageResult};

use crate::topology::{EntityId, EntityKind, EntityRef};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

const EXTENSION: &str = ".json";
const PROVISIONAL: &str = "all";

/// Name of a per-entity artifact file
///
/// Formatted as `{kind}_{id}_{all|count}[_{YYYYMMDD}].json`. A provisional
/// artifact uses `all` in place of the count until the harvest commits it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub kind: EntityKind,
    pub id: EntityId,
    /// Record count; `None` while the artifact is provisional
    pub count: Option<usize>,
    /// Retrieval date stamp added by the output aggregator
    pub stamp: Option<NaiveDate>,
}

impl ArtifactName {
    /// Name of the artifact while its harvest is still running
    pub fn provisional(entity: EntityRef) -> Self {
        Self {
            kind: entity.kind,
            id: entity.id,
            count: None,
            stamp: None,
        }
    }

    /// Final name of an artifact holding `count` records
    pub fn committed(entity: EntityRef, count: usize) -> Self {
        Self {
            count: Some(count),
            ..Self::provisional(entity)
        }
    }

    /// Returns the same name stamped with a retrieval date
    pub fn stamped(&self, date: NaiveDate) -> Self {
        Self {
            stamp: Some(date),
            ..self.clone()
        }
    }

    /// Returns the same name with the entity id replaced
    pub fn with_id(&self, id: EntityId) -> Self {
        Self { id, ..self.clone() }
    }

    pub fn entity(&self) -> EntityRef {
        EntityRef {
            kind: self.kind,
            id: self.id,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.count.is_some()
    }

    /// Parses an artifact file name
    ///
    /// # Arguments
    ///
    /// * `file_name` - A bare file name such as `competitor_5003_12.json`
    ///
    /// # Returns
    ///
    /// * `Some(ArtifactName)` - The name follows the artifact convention
    /// * `None` - Any other file
    pub fn parse(file_name: &str) -> Option<Self> {
        let base = file_name.strip_suffix(EXTENSION)?;
        let parts: Vec<&str> = base.split('_').collect();
        if !(3..=4).contains(&parts.len()) {
            return None;
        }

        let kind = EntityKind::from_prefix(parts[0])?;
        let id = parts[1].parse().ok()?;
        let count = match parts[2] {
            PROVISIONAL => None,
            n => Some(n.parse().ok()?),
        };
        let stamp = match parts.get(3) {
            Some(s) => Some(NaiveDate::parse_from_str(s, "%Y%m%d").ok()?),
            None => None,
        };

        Some(Self {
            kind,
            id,
            count,
            stamp,
        })
    }

    /// Parses the file name component of a path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(Self::parse)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_", self.kind, self.id)?;
        match self.count {
            Some(count) => write!(f, "{}", count)?,
            None => write!(f, "{}", PROVISIONAL)?,
        }
        if let Some(stamp) = self.stamp {
            write!(f, "_{}", stamp.format("%Y%m%d"))?;
        }
        write!(f, "{}", EXTENSION)
    }
}

/// Relative directory of a location's harvest slot
pub fn slot_dir(location_id: EntityId) -> PathBuf {
    PathBuf::from(location_id.to_string())
}

/// Relative path of an artifact inside a location's slot
pub fn slot_path(location_id: EntityId, name: &ArtifactName) -> PathBuf {
    slot_dir(location_id).join(name.to_string())
}

/// Serializes `value` as pretty JSON and writes it with overwrite semantics
pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn ArtifactStore,
    path: &Path,
    value: &T,
) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    store.write(path, &bytes)
}

/// Reads and deserializes a JSON artifact
pub fn read_json<T: serde::de::DeserializeOwned>(
    store: &dyn ArtifactStore,
    path: &Path,
) -> StorageResult<T> {
    let bytes = store.read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}
