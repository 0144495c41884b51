use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive date range deciding which reviews are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalWindow {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl RetrievalWindow {
    pub fn new(from: NaiveDate, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    /// Open-ended window starting at `from`
    pub fn since(from: NaiveDate) -> Self {
        Self { from, to: None }
    }

    /// Single-day window covering the day before `reference`
    pub fn previous_day(reference: DateTime<Utc>) -> Self {
        let day = retrieval_date_for(reference);
        Self::new(day, Some(day))
    }

    /// True when `date` lies strictly before the lower bound
    pub fn is_older(&self, date: NaiveDate) -> bool {
        date < self.from
    }

    /// True when an upper bound is set and `date` lies after it
    pub fn is_newer(&self, date: NaiveDate) -> bool {
        self.to.is_some_and(|to| date > to)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        !self.is_older(date) && !self.is_newer(date)
    }
}

impl fmt::Display for RetrievalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to {
            Some(to) => write!(f, "{}..={}", self.from, to),
            None => write!(f, "{}..", self.from),
        }
    }
}

/// Date a run covers: the day before its reference instant
pub fn retrieval_date_for(reference: DateTime<Utc>) -> NaiveDate {
    let today = reference.date_naive();
    today.pred_opt().unwrap_or(today)
}

/// A review date, or the listing's raw text when it could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewDate {
    Date(NaiveDate),
    Raw(String),
}

impl ReviewDate {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(date) => Some(*date),
            Self::Raw(_) => None,
        }
    }
}

impl fmt::Display for ReviewDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Date(date) => write!(f, "{}", date),
            Self::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

/// One review extracted from a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestedRecord {
    pub review_id: String,
    pub description: Option<String>,
    pub review_date: ReviewDate,
    pub retrieval_date: NaiveDate,
    pub rating: f32,
    pub username: String,
    pub reviewer_review_count: Option<u32>,
    pub reviewer_url: String,
    pub owner_reply: Option<String>,
    pub owner_reply_date: Option<ReviewDate>,
}
