use crate::common::{
    listing_page, missing_page, reference, test_config, write_page, CountingFactory,
    RecordingNotifier, TrackingFactory,
};
use chrono::{TimeZone, Utc};
use review_harvest::crawler::{run_daily, DailyInputs, EntityStatus};
use review_harvest::harvest::RetrievalWindow;
use review_harvest::storage::{ArtifactStore, FsArtifactStore};
use review_harvest::topology::EntityRef;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_locations(root: &Path, locations: Value) -> PathBuf {
    let path = root.join("locations.json");
    std::fs::write(&path, serde_json::to_string_pretty(&locations).unwrap()).unwrap();
    path
}

fn inputs(locations_path: PathBuf) -> DailyInputs {
    DailyInputs {
        locations_path,
        window: RetrievalWindow::previous_day(reference()),
        reference: reference(),
    }
}

#[tokio::test]
async fn test_daily_run_harvests_formats_and_copies_duplicates() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let loc24 = write_page(
        root,
        "24.html",
        &listing_page("loc24", &["an hour ago", "a day ago", "a day ago", "5 days ago"]),
    );
    let comp5003 = write_page(
        root,
        "5003.html",
        &listing_page("comp5003", &["a day ago", "3 days ago"]),
    );
    let loc28 = write_page(root, "28.html", &listing_page("loc28", &["a day ago"]));

    let locations_path = write_locations(
        root,
        json!([
            {
                "id": 24, "url": loc24, "address": "1 Main St", "name": "Cafe Uno",
                "type": "cafe", "brand_name": "Uno",
                "competitors": [
                    {"id": 5003, "url": comp5003, "address": "9 Market Sq", "name": "Rival"}
                ]
            },
            {
                "id": 28, "url": loc28, "address": "2 Main St", "name": "Cafe Due",
                "type": "cafe", "brand_name": "Due",
                "competitors": [
                    {"id": 5004, "url": missing_page(root), "address": " 9 market sq ", "name": "Rival Too"}
                ]
            }
        ]),
    );

    let config = test_config(root);
    let factory = Arc::new(CountingFactory::new(&config));
    let notifier = Arc::new(RecordingNotifier::default());

    let report = run_daily(
        &config,
        &inputs(locations_path),
        factory.clone(),
        notifier.clone(),
    )
    .await
    .unwrap();

    // 5004 shares 5003's address and is never visited
    assert_eq!(factory.launches(), 3);
    assert_eq!(report.crawl.harvested(), 3);
    assert_eq!(report.crawl.aborted().count(), 0);
    assert_eq!(report.crawl.total_records(), 4);
    assert_eq!(
        report.crawl.duplicates_copied,
        vec![Path::new("28").join("competitor_5004_1.json")]
    );

    let output = FsArtifactStore::new(&config.storage.output_dir);
    let mut written: Vec<String> = report
        .formatted
        .written
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    written.sort();
    assert_eq!(
        written,
        vec![
            "competitor_5003_1_20250114.json",
            "competitor_5004_1_20250114.json",
            "location_24_2_20250114.json",
            "location_28_1_20250114.json",
        ]
    );

    let duplicate: Value = serde_json::from_slice(
        &output
            .read(Path::new("competitor_5004_1_20250114.json"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(duplicate[0]["competitor_id"], json!(5004));
    assert_eq!(duplicate[0]["competitor_name"], json!("Rival Too"));
    assert_eq!(duplicate[0]["location_id"], json!(28));
    assert_eq!(duplicate[0]["review_id"], json!("comp5003-1"));

    let location: Value = serde_json::from_slice(
        &output
            .read(Path::new("location_24_2_20250114.json"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(location.as_array().unwrap().len(), 2);
    assert_eq!(location[0]["location_brand_name"], json!("Uno"));
    assert_eq!(location[0]["retrieval_date"], json!("2025-01-14"));

    assert_eq!(report.tally.location_records, 3);
    assert_eq!(report.tally.competitor_records, 2);

    let messages = notifier.messages();
    assert_eq!(
        &messages[..6],
        &[
            "🔄: Starting reviews daily scraper",
            "🔄: Done reviews daily scraper",
            "🔄: Starting reviews formatter",
            "🔄: Done reviews formatter",
            ":abacus: Total reviews daily for locations: 3",
            ":abacus: Total reviews daily for competitors: 2",
        ]
    );
    assert_eq!(messages.len(), 7);
    assert!(messages[6].starts_with("🔄: Total duration: 00:00:"));
}

#[tokio::test]
async fn test_failing_location_is_retried_then_aborted() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let broken = missing_page(root);
    let comp5003 = write_page(root, "5003.html", &listing_page("comp5003", &["a day ago"]));
    let locations_path = write_locations(
        root,
        json!([
            {
                "id": 24, "url": broken, "name": "Cafe Uno",
                "competitors": [
                    {"id": 5003, "url": comp5003, "address": "9 Market Sq", "name": "Rival"}
                ]
            }
        ]),
    );

    let config = test_config(root);
    let factory = Arc::new(CountingFactory::new(&config));
    let notifier = Arc::new(RecordingNotifier::default());

    let report = run_daily(
        &config,
        &inputs(locations_path),
        factory.clone(),
        notifier.clone(),
    )
    .await
    .unwrap();

    // three attempts for the location, one for its competitor
    assert_eq!(factory.launches(), 4);

    let location = report.crawl.entity(EntityRef::location(24)).unwrap();
    assert!(matches!(
        location.status,
        EntityStatus::Aborted { attempts: 3, .. }
    ));

    let competitor = report.crawl.entity(EntityRef::competitor(5003)).unwrap();
    assert_eq!(
        competitor.status,
        EntityStatus::Harvested {
            records: 1,
            attempts: 1
        }
    );

    let abort = format!("❌: Abort id: 24: {}.", broken);
    assert_eq!(
        notifier
            .messages()
            .iter()
            .filter(|m| **m == abort)
            .count(),
        1
    );

    let work = FsArtifactStore::new(&config.storage.work_dir);
    assert!(work.exists(&Path::new("24").join("competitor_5003_1.json")));
}

#[tokio::test]
async fn test_missing_locations_file_fails_the_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let factory = Arc::new(CountingFactory::new(&config));
    let notifier = Arc::new(RecordingNotifier::default());

    let result = run_daily(
        &config,
        &inputs(dir.path().join("absent.json")),
        factory.clone(),
        notifier,
    )
    .await;

    assert!(result.is_err());
    assert_eq!(factory.launches(), 0);
}

#[tokio::test]
async fn test_daily_tally_counts_only_this_run() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let loc24 = write_page(root, "24.html", &listing_page("loc24", &["a day ago"]));
    let locations_path = write_locations(
        root,
        json!([{ "id": 24, "url": loc24, "name": "Cafe Uno" }]),
    );
    let config = test_config(root);

    let mut reports = Vec::new();
    for day in [15, 16] {
        let reference = Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap();
        let inputs = DailyInputs {
            locations_path: locations_path.clone(),
            window: RetrievalWindow::previous_day(reference),
            reference,
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let report = run_daily(
            &config,
            &inputs,
            Arc::new(CountingFactory::new(&config)),
            notifier.clone(),
        )
        .await
        .unwrap();
        assert!(notifier
            .messages()
            .contains(&":abacus: Total reviews daily for locations: 1".to_string()));
        reports.push(report);
    }

    assert_eq!(reports[0].tally.location_records, 1);
    assert_eq!(reports[1].tally.location_records, 1);
    assert_eq!(reports[1].tally.location_files, 1);
    assert_eq!(
        reports[1].formatted.written,
        vec![PathBuf::from("location_24_1_20250115.json")]
    );

    let output = FsArtifactStore::new(&config.storage.output_dir);
    assert_eq!(
        output.list(Path::new("")).unwrap(),
        vec![
            PathBuf::from("location_24_1_20250114.json"),
            PathBuf::from("location_24_1_20250115.json"),
        ]
    );
}

#[tokio::test]
async fn test_live_drivers_never_exceed_concurrency() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let locations: Vec<Value> = (1..=6)
        .map(|id| {
            let url = write_page(
                root,
                &format!("{id}.html"),
                &listing_page(&format!("loc{id}"), &["a day ago"]),
            );
            json!({ "id": id, "url": url, "name": format!("Cafe {id}") })
        })
        .collect();
    let locations_path = write_locations(root, Value::Array(locations));

    let config = test_config(root);
    assert_eq!(config.crawler.max_concurrent_locations, 2);
    let factory =
        Arc::new(TrackingFactory::new(&config).with_navigate_delay(Duration::from_millis(20)));

    let report = run_daily(
        &config,
        &inputs(locations_path),
        factory.clone(),
        Arc::new(RecordingNotifier::default()),
    )
    .await
    .unwrap();

    assert_eq!(report.crawl.harvested(), 6);
    assert_eq!(factory.peak_live(), 2);
    assert_eq!(factory.live(), 0);
    assert_eq!(factory.releases(), 6);
}

#[tokio::test]
async fn test_each_competitor_has_its_own_attempts() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let loc24 = write_page(root, "24.html", &listing_page("loc24", &["a day ago"]));
    let comp5004 = write_page(root, "5004.html", &listing_page("comp5004", &["a day ago"]));
    let locations_path = write_locations(
        root,
        json!([
            {
                "id": 24, "url": loc24, "name": "Cafe Uno",
                "competitors": [
                    {"id": 5003, "url": missing_page(root), "address": "9 Market Sq", "name": "Rival"},
                    {"id": 5004, "url": comp5004, "address": "11 Market Sq", "name": "Other Rival"}
                ]
            }
        ]),
    );

    let config = test_config(root);
    let factory = Arc::new(CountingFactory::new(&config));

    let report = run_daily(
        &config,
        &inputs(locations_path),
        factory.clone(),
        Arc::new(RecordingNotifier::default()),
    )
    .await
    .unwrap();

    // one for the location, three for 5003, one for 5004
    assert_eq!(factory.launches(), 5);
    assert_eq!(
        report.crawl.entity(EntityRef::location(24)).unwrap().status,
        EntityStatus::Harvested {
            records: 1,
            attempts: 1
        }
    );
    assert!(matches!(
        report.crawl.entity(EntityRef::competitor(5003)).unwrap().status,
        EntityStatus::Aborted { attempts: 3, .. }
    ));
    assert_eq!(
        report.crawl.entity(EntityRef::competitor(5004)).unwrap().status,
        EntityStatus::Harvested {
            records: 1,
            attempts: 1
        }
    );
}

#[tokio::test]
async fn test_aborted_competitor_leaves_no_partial_artifact() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    let loc24 = write_page(
        root,
        "24.html",
        &listing_page("loc24", &["a day ago", "5 days ago"]),
    );
    let comp5003 = write_page(
        root,
        "5003.html",
        &listing_page("comp5003", &["a day ago", "a day ago", "a day ago"]),
    );
    let locations_path = write_locations(
        root,
        json!([
            {
                "id": 24, "url": loc24, "name": "Cafe Uno",
                "competitors": [
                    {"id": 5003, "url": comp5003, "address": "9 Market Sq", "name": "Rival"}
                ]
            }
        ]),
    );

    let config = test_config(root);
    let factory = Arc::new(TrackingFactory::new(&config).failing_scroll_on("5003.html"));

    let report = run_daily(
        &config,
        &inputs(locations_path),
        factory.clone(),
        Arc::new(RecordingNotifier::default()),
    )
    .await
    .unwrap();

    assert!(matches!(
        report.crawl.entity(EntityRef::competitor(5003)).unwrap().status,
        EntityStatus::Aborted { attempts: 3, .. }
    ));

    // the first batch was saved before each failing scroll
    let work = FsArtifactStore::new(&config.storage.work_dir);
    assert_eq!(
        work.list(Path::new("24")).unwrap(),
        vec![Path::new("24").join("location_24_1.json")]
    );

    // every attempt released its driver, failed ones included
    assert_eq!(factory.releases(), 4);
    assert_eq!(factory.live(), 0);
}
