use crate::common::{date, listing_page, missing_page, reference, test_config, write_page, CountingFactory};
use review_harvest::harvest::{HarvestOptions, HarvestTarget, Harvester, RetrievalWindow, ReviewDate};
use review_harvest::state::StopReason;
use review_harvest::storage::{ArtifactStore, FsArtifactStore};
use review_harvest::topology::EntityRef;
use review_harvest::HarvestError;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn harvester(root: &Path, options: HarvestOptions) -> (Harvester, Arc<FsArtifactStore>) {
    let config = test_config(root);
    let store = Arc::new(FsArtifactStore::new(&config.storage.work_dir));
    let harvester = Harvester::new(
        config.harvester.clone(),
        config.selectors.clone(),
        options,
        store.clone(),
    );
    (harvester, store)
}

fn location_target(id: u64, url: String) -> HarvestTarget {
    HarvestTarget {
        entity: EntityRef::location(id),
        url,
        slot: id,
    }
}

#[tokio::test]
async fn test_harvest_yesterday_from_saved_listing() {
    let dir = TempDir::new().unwrap();
    let url = write_page(
        dir.path(),
        "24.html",
        &listing_page(
            "loc24",
            &["an hour ago", "a day ago", "a day ago", "2 days ago", "a day ago"],
        ),
    );
    let options = HarvestOptions::new(
        RetrievalWindow::previous_day(reference()),
        0,
        false,
        reference(),
    );
    let (harvester, store) = harvester(dir.path(), options);
    let factory = CountingFactory::new(&test_config(dir.path()));

    let outcome = harvester
        .harvest(&factory, &location_target(24, url))
        .await
        .unwrap();

    let ids: Vec<&str> = outcome.records.iter().map(|r| r.review_id.as_str()).collect();
    assert_eq!(ids, vec!["loc24-2", "loc24-3"]);
    assert_eq!(outcome.stop_reason, StopReason::WindowExhausted);
    assert_eq!(outcome.total_reviews.as_deref(), Some("5 reviews"));
    assert_eq!(factory.launches(), 1);

    let record = &outcome.records[0];
    assert_eq!(record.username, "User 2");
    assert_eq!(record.rating, 4.0);
    assert_eq!(record.reviewer_review_count, Some(2));
    assert_eq!(record.review_date, ReviewDate::Date(date(2025, 1, 14)));
    assert_eq!(record.retrieval_date, date(2025, 1, 14));
    assert_eq!(record.description.as_deref(), Some("Review 2 of loc24"));

    let artifact = outcome.artifact.unwrap();
    assert_eq!(artifact, Path::new("24").join("location_24_2.json"));
    assert!(store.exists(&artifact));
}

#[tokio::test]
async fn test_harvest_resumes_past_skipped_items() {
    let dir = TempDir::new().unwrap();
    let url = write_page(dir.path(), "24.html", &listing_page("loc24", &["a day ago"; 5]));
    let options = HarvestOptions::new(
        RetrievalWindow::since(date(2025, 1, 1)),
        3,
        false,
        reference(),
    );
    let (harvester, _store) = harvester(dir.path(), options);
    let factory = CountingFactory::new(&test_config(dir.path()));

    let outcome = harvester
        .harvest(&factory, &location_target(24, url))
        .await
        .unwrap();

    let ids: Vec<&str> = outcome.records.iter().map(|r| r.review_id.as_str()).collect();
    assert_eq!(ids, vec!["loc24-4", "loc24-5"]);
    assert_eq!(outcome.stop_reason, StopReason::NoMoreItems);
}

#[tokio::test]
async fn test_harvest_leaves_no_artifact_when_nothing_matches() {
    let dir = TempDir::new().unwrap();
    let url = write_page(dir.path(), "24.html", &listing_page("loc24", &["3 weeks ago"]));
    let options = HarvestOptions::new(
        RetrievalWindow::previous_day(reference()),
        0,
        false,
        reference(),
    );
    let (harvester, store) = harvester(dir.path(), options);
    let factory = CountingFactory::new(&test_config(dir.path()));

    let outcome = harvester
        .harvest(&factory, &location_target(24, url))
        .await
        .unwrap();

    assert!(outcome.records.is_empty());
    assert!(outcome.artifact.is_none());
    assert!(store.list(Path::new("24")).unwrap().is_empty());
}

#[tokio::test]
async fn test_harvest_missing_page_is_navigation_error() {
    let dir = TempDir::new().unwrap();
    let options = HarvestOptions::new(
        RetrievalWindow::previous_day(reference()),
        0,
        false,
        reference(),
    );
    let (harvester, _store) = harvester(dir.path(), options);
    let factory = CountingFactory::new(&test_config(dir.path()));

    let result = harvester
        .harvest(&factory, &location_target(24, missing_page(dir.path())))
        .await;

    assert!(matches!(result, Err(HarvestError::Navigation { .. })));
}
