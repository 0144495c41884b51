//! Field extraction for a single listing item

use crate::config::SelectorConfig;
use crate::driver::{NodeHandle, PageDriver};
use crate::harvest::record::{HarvestedRecord, ReviewDate};
use crate::harvest::HarvestOptions;
use crate::time::normalize;
use crate::{HarvestError, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

static REVIEWER_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+) reviews?").expect("reviewer count pattern is valid")
});

/// What reading one item yielded
#[derive(Debug)]
pub(crate) enum ItemOutcome {
    /// In-window review
    Record(Box<HarvestedRecord>),
    /// Newer than the window's upper bound; skipped
    AfterWindow,
    /// Older than the window's lower bound; ends the listing
    BeforeWindow,
}

/// Reads one listing item
///
/// The date is read first so out-of-window items are classified without
/// touching any other field. An item missing a required field fails with
/// `HarvestError::Extraction`.
pub(crate) async fn extract_item(
    driver: &mut dyn PageDriver,
    item: NodeHandle,
    selectors: &SelectorConfig,
    options: &HarvestOptions,
) -> Result<ItemOutcome> {
    let date_text = text_within(driver, item, &selectors.review_date)
        .await?
        .ok_or_else(|| missing("review date", &selectors.review_date))?;

    let review_date = match normalize(date_text.as_str(), options.reference) {
        Ok(instant) => {
            let date = instant.date_naive();
            if options.window.is_older(date) {
                return Ok(ItemOutcome::BeforeWindow);
            }
            if options.window.is_newer(date) {
                return Ok(ItemOutcome::AfterWindow);
            }
            ReviewDate::Date(date)
        }
        Err(e) => {
            tracing::warn!("Keeping raw review date: {}", e);
            ReviewDate::Raw(date_text)
        }
    };

    if let Some(more) = first_within(driver, item, &selectors.more_button).await? {
        driver.click(more).await?;
    }

    let review_id = driver
        .read_attribute(item, "data-review-id")
        .await?
        .filter(|id| !id.is_empty())
        .ok_or_else(|| HarvestError::Extraction("missing data-review-id".to_string()))?;

    let username = driver
        .read_attribute(item, "aria-label")
        .await?
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| HarvestError::Extraction(format!("review {review_id}: missing username")))?;

    let rating_node = first_within(driver, item, &selectors.rating)
        .await?
        .ok_or_else(|| missing("rating", &selectors.rating))?;
    let rating_label = driver
        .read_attribute(rating_node, "aria-label")
        .await?
        .unwrap_or_default();
    let rating = parse_rating(&rating_label).ok_or_else(|| {
        HarvestError::Extraction(format!(
            "review {review_id}: unreadable rating {rating_label:?}"
        ))
    })?;

    let reviewer_url_node = first_within(driver, item, &selectors.reviewer_url)
        .await?
        .ok_or_else(|| missing("reviewer url", &selectors.reviewer_url))?;
    let reviewer_url = driver
        .read_attribute(reviewer_url_node, "data-href")
        .await?
        .ok_or_else(|| {
            HarvestError::Extraction(format!("review {review_id}: reviewer url has no data-href"))
        })?;

    let description = text_within(driver, item, &selectors.description).await?;
    let reviewer_review_count = text_within(driver, item, &selectors.reviewer_count)
        .await?
        .and_then(|text| parse_reviewer_count(&text));
    let owner_reply = text_within(driver, item, &selectors.owner_reply).await?;
    let owner_reply_date = text_within(driver, item, &selectors.owner_reply_date)
        .await?
        .map(|text| reply_date(text, options.reference));

    Ok(ItemOutcome::Record(Box::new(HarvestedRecord {
        review_id,
        description,
        review_date,
        retrieval_date: options.retrieval_date,
        rating,
        username,
        reviewer_review_count,
        reviewer_url,
        owner_reply,
        owner_reply_date,
    })))
}

fn missing(field: &str, selector: &str) -> HarvestError {
    HarvestError::Extraction(format!("missing {field} ({selector})"))
}

async fn first_within(
    driver: &mut dyn PageDriver,
    node: NodeHandle,
    selector: &str,
) -> Result<Option<NodeHandle>> {
    Ok(driver.find_within(node, selector).await?.into_iter().next())
}

/// Text of the first match under `node`, if any and non-empty
async fn text_within(
    driver: &mut dyn PageDriver,
    node: NodeHandle,
    selector: &str,
) -> Result<Option<String>> {
    match first_within(driver, node, selector).await? {
        Some(found) => {
            let text = driver.read_text(found).await?;
            Ok(Some(text).filter(|t| !t.is_empty()))
        }
        None => Ok(None),
    }
}

fn reply_date(text: String, reference: DateTime<Utc>) -> ReviewDate {
    match normalize(text.as_str(), reference) {
        Ok(instant) => ReviewDate::Date(instant.date_naive()),
        Err(_) => ReviewDate::Raw(text),
    }
}

/// Parses the leading number of a label such as `"4 stars"` or `"4,5 stars"`
fn parse_rating(label: &str) -> Option<f32> {
    label
        .split_whitespace()
        .next()
        .and_then(|token| token.replace(',', ".").parse().ok())
}

/// Parses `"Local Guide · 12 reviews"` into `12`
fn parse_reviewer_count(text: &str) -> Option<u32> {
    REVIEWER_COUNT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
