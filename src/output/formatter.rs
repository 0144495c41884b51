//! Output aggregation
//!
//! Merges each committed harvest artifact with its entity's metadata and
//! writes the result, stamped with the retrieval date, to the output store.

use crate::output::{OutputError, OutputResult};
use crate::storage::{read_json, write_json, ArtifactName, ArtifactStore};
use crate::topology::{Competitor, EntityId, EntityKind, Location};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

type Record = Map<String, Value>;

/// Identity fields for every entity of the raw topology
///
/// Built from the unfiltered seed data so a duplicate competitor is tagged
/// with its own identity and its own owning location.
pub struct MetadataIndex<'a> {
    locations: HashMap<EntityId, &'a Location>,
    competitors: HashMap<EntityId, (&'a Competitor, EntityId)>,
}

impl<'a> MetadataIndex<'a> {
    pub fn build(raw_locations: &'a [Location]) -> Self {
        let mut locations = HashMap::new();
        let mut competitors = HashMap::new();

        for location in raw_locations {
            locations.insert(location.id, location);
            for competitor in &location.competitors {
                competitors.insert(competitor.id, (competitor, location.id));
            }
        }

        Self {
            locations,
            competitors,
        }
    }

    /// Metadata fields to merge into records of the named artifact
    pub fn fields_for(&self, kind: EntityKind, id: EntityId) -> Option<Record> {
        match kind {
            EntityKind::Location => self.locations.get(&id).map(|l| location_fields(l)),
            EntityKind::Competitor => {
                let (competitor, owner) = self.competitors.get(&id)?;
                let mut fields = self
                    .locations
                    .get(owner)
                    .map(|l| location_fields(l))
                    .unwrap_or_default();
                fields.extend(competitor_fields(competitor));
                Some(fields)
            }
        }
    }
}

fn location_fields(location: &Location) -> Record {
    let mut fields = Map::new();
    fields.insert("location_id".into(), location.id.into());
    fields.insert("location_name".into(), location.name.clone().into());
    fields.insert("location_address".into(), location.address.clone().into());
    fields.insert("location_type".into(), location.location_type.clone().into());
    fields.insert(
        "location_brand_name".into(),
        location.brand_name.clone().into(),
    );
    fields.insert("location_url".into(), location.url.clone().into());
    fields
}

fn competitor_fields(competitor: &Competitor) -> Record {
    let mut fields = Map::new();
    fields.insert("competitor_id".into(), competitor.id.into());
    fields.insert("competitor_name".into(), competitor.name.clone().into());
    fields.insert(
        "competitor_address".into(),
        competitor.address.clone().into(),
    );
    fields.insert("competitor_url".into(), competitor.url.clone().into());
    fields
}

/// Files produced and skipped by one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Merges every committed artifact under `work` into `output`
///
/// # Arguments
///
/// * `work` - Store holding one slot directory per location
/// * `output` - Store receiving the merged artifacts
/// * `raw_locations` - The unfiltered seed topology
/// * `retrieval_date` - Date stamped onto each output file name
///
/// # Returns
///
/// * `Ok(AggregateReport)` - Written and skipped artifacts
/// * `Err(OutputError)` - The work store could not be listed
pub fn aggregate(
    work: &dyn ArtifactStore,
    output: &dyn ArtifactStore,
    raw_locations: &[Location],
    retrieval_date: NaiveDate,
) -> OutputResult<AggregateReport> {
    let index = MetadataIndex::build(raw_locations);
    let mut report = AggregateReport::default();

    for slot in work.list_dirs(Path::new(""))? {
        for path in work.list(&slot)? {
            match merge_artifact(work, output, &index, &path, retrieval_date) {
                Ok(Some(written)) => report.written.push(written),
                Ok(None) => report.skipped.push(path),
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", path.display(), e);
                    report.skipped.push(path);
                }
            }
        }
    }

    tracing::info!(
        "Formatted {} artifacts ({} skipped)",
        report.written.len(),
        report.skipped.len()
    );

    Ok(report)
}

fn merge_artifact(
    work: &dyn ArtifactStore,
    output: &dyn ArtifactStore,
    index: &MetadataIndex<'_>,
    path: &Path,
    retrieval_date: NaiveDate,
) -> OutputResult<Option<PathBuf>> {
    let Some(name) = ArtifactName::from_path(path) else {
        return Ok(None);
    };
    if !name.is_committed() || name.stamp.is_some() {
        tracing::debug!("Ignoring uncommitted artifact {}", path.display());
        return Ok(None);
    }

    let fields = index
        .fields_for(name.kind, name.id)
        .ok_or_else(|| OutputError::UnknownEntity(name.entity().to_string()))?;

    let mut records: Vec<Record> = read_json(work, path)?;
    for record in &mut records {
        record.extend(fields.clone());
    }

    let target = PathBuf::from(name.stamped(retrieval_date).to_string());
    write_json(output, &target, &records)?;
    Ok(Some(target))
}
