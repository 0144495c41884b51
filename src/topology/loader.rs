use crate::topology::{EntityRef, Location};
use crate::{TopologyError, TopologyResult};
use std::path::Path;
use url::Url;

/// Loads the seed locations file
///
/// The file is a JSON array of locations, each with a nested `competitors`
/// array. Every entity URL is validated.
///
/// # Arguments
///
/// * `path` - Path to the JSON seed file
///
/// # Returns
///
/// * `Ok(Vec<Location>)` - Locations in file order
/// * `Err(TopologyError)` - Failed to read, parse, or validate the file
pub fn load_locations(path: &Path) -> TopologyResult<Vec<Location>> {
    let content = std::fs::read_to_string(path)?;
    let locations = parse_locations(&content)?;

    tracing::info!(
        "Loaded {} locations from {}",
        locations.len(),
        path.display()
    );

    Ok(locations)
}

/// Parses and validates seed locations from a JSON string
pub fn parse_locations(content: &str) -> TopologyResult<Vec<Location>> {
    let locations: Vec<Location> = serde_json::from_str(content)?;

    for location in &locations {
        validate_url(EntityRef::location(location.id), &location.url)?;
        for competitor in &location.competitors {
            validate_url(EntityRef::competitor(competitor.id), &competitor.url)?;
        }
    }

    Ok(locations)
}

fn validate_url(entity: EntityRef, url: &str) -> TopologyResult<()> {
    let parsed = Url::parse(url).map_err(|e| TopologyError::InvalidUrl {
        entity: entity.to_string(),
        message: format!("{}: {}", url, e),
    })?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        other => Err(TopologyError::InvalidUrl {
            entity: entity.to_string(),
            message: format!("unsupported scheme '{}'", other),
        }),
    }
}
