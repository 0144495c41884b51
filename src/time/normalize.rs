use crate::time::{TimeError, TimeResult};
use chrono::{DateTime, Duration, Months, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// `[word ]* <int> <unit>(s) ago`, e.g. "Edited 2 years ago" or "3 weeks ago"
static NUMERIC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z]+ )*([0-9]+) (second|minute|hour|day|week|month|year)s? ago$")
        .expect("numeric time pattern is valid")
});

/// `[word ]* a|an <unit> ago`, e.g. "Edited a year ago" or "an hour ago"
static SINGULAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z]+ )*(a|an) (second|minute|hour|day|week|month|year) ago$")
        .expect("singular time pattern is valid")
});

const JUST_NOW: &str = "just now";

/// Calendar unit of a relative time expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeUnit {
    /// Parses the singular unit word used in the grammar
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "second" => Some(Self::Second),
            "minute" => Some(Self::Minute),
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "year" => Some(Self::Year),
            _ => None,
        }
    }

    /// The indefinite article the singular form requires ("an hour", "a day")
    pub fn article(&self) -> &'static str {
        match self {
            Self::Hour => "an",
            _ => "a",
        }
    }

    /// Subtracts `amount` of this unit from `reference`
    ///
    /// Months and years are calendar-aware: the day of month is kept and
    /// clamped to the last day of the target month when needed.
    fn subtract(self, reference: DateTime<Utc>, amount: u32) -> Option<DateTime<Utc>> {
        let amount_i64 = i64::from(amount);
        let fixed = match self {
            Self::Second => Duration::try_seconds(amount_i64),
            Self::Minute => Duration::try_minutes(amount_i64),
            Self::Hour => Duration::try_hours(amount_i64),
            Self::Day => Duration::try_days(amount_i64),
            Self::Week => Duration::try_weeks(amount_i64),
            Self::Month => return reference.checked_sub_months(Months::new(amount)),
            Self::Year => {
                return reference.checked_sub_months(Months::new(amount.checked_mul(12)?))
            }
        };

        reference.checked_sub_signed(fixed?)
    }
}

/// Converts a human-relative timestamp into an absolute instant
///
/// Grammars are tried in a fixed order and the first match wins:
///
/// 1. `[word ]* <int> <unit>(s) ago` ("Edited 2 years ago", "5 days ago")
/// 2. `[word ]* a|an <unit> ago` ("Edited a year ago", "an hour ago");
///    "hour" takes "an", every other unit takes "a"
/// 3. the literal `just now`, which maps to `reference` itself
///
/// Matching is case-insensitive and runs of whitespace collapse to a single
/// space. No timezone conversion happens; `reference` is used as given.
///
/// # Errors
///
/// * `TimeError::UnsupportedFormat` - `text` is missing, blank, or matches no grammar
/// * `TimeError::OutOfRange` - the offset cannot be represented
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use review_harvest::time::normalize;
///
/// let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
/// let parsed = normalize("Edited 2 years ago", now).unwrap();
/// assert_eq!(parsed, Utc.with_ymd_and_hms(2023, 1, 15, 12, 0, 0).unwrap());
/// ```
pub fn normalize<'a>(
    text: impl Into<Option<&'a str>>,
    reference: DateTime<Utc>,
) -> TimeResult<DateTime<Utc>> {
    let raw = text.into().unwrap_or_default();
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    if collapsed.is_empty() {
        return Err(TimeError::UnsupportedFormat(raw.to_string()));
    }

    if let Some(captures) = NUMERIC_PATTERN.captures(&collapsed) {
        let amount: u32 = captures[1]
            .parse()
            .map_err(|_| TimeError::OutOfRange(raw.to_string()))?;
        let unit = unit_from_capture(&captures[2], raw)?;
        return unit
            .subtract(reference, amount)
            .ok_or_else(|| TimeError::OutOfRange(raw.to_string()));
    }

    if let Some(captures) = SINGULAR_PATTERN.captures(&collapsed) {
        let unit = unit_from_capture(&captures[2], raw)?;
        if &captures[1] == unit.article() {
            return unit
                .subtract(reference, 1)
                .ok_or_else(|| TimeError::OutOfRange(raw.to_string()));
        }
    }

    if collapsed == JUST_NOW {
        return Ok(reference);
    }

    Err(TimeError::UnsupportedFormat(raw.to_string()))
}

fn unit_from_capture(word: &str, raw: &str) -> TimeResult<TimeUnit> {
    TimeUnit::from_word(word).ok_or_else(|| TimeError::UnsupportedFormat(raw.to_string()))
}
