//! Record tallies from output artifacts
//!
//! Counts are read from artifact file names, which encode each entity's
//! record count, so no artifact needs to be opened.

use crate::output::OutputResult;
use crate::storage::{ArtifactName, ArtifactStore};
use crate::topology::EntityKind;
use std::path::Path;

/// Record totals per entity kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordTally {
    pub location_records: usize,
    pub competitor_records: usize,
    pub location_files: usize,
    pub competitor_files: usize,
}

impl RecordTally {
    /// Adds one artifact to the tally
    pub fn add(&mut self, name: &ArtifactName) {
        let count = name.count.unwrap_or(0);
        match name.kind {
            EntityKind::Location => {
                self.location_records += count;
                self.location_files += 1;
            }
            EntityKind::Competitor => {
                self.competitor_records += count;
                self.competitor_files += 1;
            }
        }
    }

    pub fn total_records(&self) -> usize {
        self.location_records + self.competitor_records
    }

    /// Summary lines sent as run notifications
    pub fn notification_lines(&self) -> [String; 2] {
        [
            format!(
                ":abacus: Total reviews daily for locations: {}",
                self.location_records
            ),
            format!(
                ":abacus: Total reviews daily for competitors: {}",
                self.competitor_records
            ),
        ]
    }
}

/// Tallies every committed artifact directly inside `dir`
///
/// # Arguments
///
/// * `store` - Store to read
/// * `dir` - Directory within the store, `""` for its root
///
/// # Returns
///
/// * `Ok(RecordTally)` - Totals per entity kind
/// * `Err(OutputError)` - The directory could not be listed
pub fn tally_records(store: &dyn ArtifactStore, dir: &Path) -> OutputResult<RecordTally> {
    let mut tally = RecordTally::default();

    for path in store.list(dir)? {
        match ArtifactName::from_path(&path) {
            Some(name) if name.is_committed() => tally.add(&name),
            _ => tracing::debug!("Not counting {}", path.display()),
        }
    }

    Ok(tally)
}

/// Tallies the given artifact paths, such as the files one run wrote
///
/// Paths that are not committed artifact names are ignored.
pub fn tally_names<P: AsRef<Path>>(paths: &[P]) -> RecordTally {
    let mut tally = RecordTally::default();
    for path in paths {
        if let Some(name) = ArtifactName::from_path(path.as_ref()) {
            if name.is_committed() {
                tally.add(&name);
            }
        }
    }
    tally
}

/// Prints a tally to stdout in a formatted manner
pub fn print_tally(tally: &RecordTally) {
    println!("=== Review Totals ===\n");
    println!(
        "  Locations:   {} reviews in {} files",
        tally.location_records, tally.location_files
    );
    println!(
        "  Competitors: {} reviews in {} files",
        tally.competitor_records, tally.competitor_files
    );
    println!();
    println!("Total: {} reviews", tally.total_records());
}
