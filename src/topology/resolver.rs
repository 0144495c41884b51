use crate::topology::{EntityId, Location};
use std::collections::{HashMap, HashSet};

/// Competitors sharing one physical address
///
/// The first competitor encountered (locations in input order, then their
/// competitors in input order) is canonical; the rest are duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub canonical: EntityId,
    pub duplicates: Vec<EntityId>,
}

impl DuplicateGroup {
    /// Returns true if `id` is a non-canonical member of this group
    pub fn contains_duplicate(&self, id: EntityId) -> bool {
        self.duplicates.contains(&id)
    }
}

/// Result of resolving the raw seed topology
#[derive(Debug, Clone, Default)]
pub struct ResolvedTopology {
    /// Locations with every duplicate competitor removed
    pub locations: Vec<Location>,

    /// Duplicate groups in order of first appearance
    pub duplicate_groups: Vec<DuplicateGroup>,

    /// Competitor id -> owning location id, built from the unfiltered input
    pub competitor_owner: HashMap<EntityId, EntityId>,
}

impl ResolvedTopology {
    /// Returns the set of every non-canonical competitor id
    pub fn duplicate_ids(&self) -> HashSet<EntityId> {
        self.duplicate_groups
            .iter()
            .flat_map(|group| group.duplicates.iter().copied())
            .collect()
    }

    /// Total number of competitors that will actually be harvested
    pub fn competitor_count(&self) -> usize {
        self.locations.iter().map(|l| l.competitors.len()).sum()
    }
}

/// Normalizes an address for duplicate grouping
///
/// Case is folded and runs of whitespace collapse to one space.
pub fn normalize_address(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolves raw locations into a deduplicated work list
///
/// # Algorithm
///
/// 1. Group every competitor across all locations by normalized address,
///    preserving encounter order
/// 2. Drop groups of size 1; in the others the first id is canonical
/// 3. Index competitor -> owning location from the unfiltered input so that
///    duplicates can still be placed under their own location
/// 4. Remove every duplicate (non-canonical) competitor from every location
///
/// Competitors with a blank address are never grouped. A competitor id is
/// placed in at most one group.
///
/// # Example
///
/// ```
/// use review_harvest::topology::{resolve, Competitor, Location};
///
/// let competitor = |id: u64, address: &str| Competitor {
///     id,
///     url: format!("https://maps.example.com/{id}"),
///     address: address.to_string(),
///     name: String::new(),
/// };
/// let location = |id: u64, competitors| Location {
///     id,
///     url: format!("https://maps.example.com/{id}"),
///     address: String::new(),
///     name: String::new(),
///     location_type: None,
///     brand_name: None,
///     competitors,
/// };
///
/// let resolved = resolve(&[
///     location(1, vec![competitor(5003, "A")]),
///     location(2, vec![competitor(5004, "A"), competitor(8003, "B")]),
/// ]);
/// assert_eq!(resolved.duplicate_groups.len(), 1);
/// assert_eq!(resolved.duplicate_groups[0].canonical, 5003);
/// assert!(resolved.locations[1].competitors.iter().all(|c| c.id != 5004));
/// ```
pub fn resolve(raw_locations: &[Location]) -> ResolvedTopology {
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<EntityId>> = Vec::new();
    let mut assigned: HashSet<EntityId> = HashSet::new();
    let mut competitor_owner = HashMap::new();

    for location in raw_locations {
        for competitor in &location.competitors {
            competitor_owner.insert(competitor.id, location.id);

            let address = normalize_address(&competitor.address);
            if address.is_empty() || !assigned.insert(competitor.id) {
                continue;
            }

            let index = *group_index.entry(address).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[index].push(competitor.id);
        }
    }

    let duplicate_groups: Vec<DuplicateGroup> = groups
        .into_iter()
        .filter(|ids| ids.len() > 1)
        .map(|ids| DuplicateGroup {
            canonical: ids[0],
            duplicates: ids[1..].to_vec(),
        })
        .collect();

    let rejected: HashSet<EntityId> = duplicate_groups
        .iter()
        .flat_map(|group| group.duplicates.iter().copied())
        .collect();

    let locations = raw_locations
        .iter()
        .map(|location| {
            let mut cleaned = location.clone();
            cleaned.competitors.retain(|c| !rejected.contains(&c.id));
            cleaned
        })
        .collect();

    tracing::debug!(
        "Resolved {} locations, {} duplicate groups",
        raw_locations.len(),
        duplicate_groups.len()
    );

    ResolvedTopology {
        locations,
        duplicate_groups,
        competitor_owner,
    }
}
