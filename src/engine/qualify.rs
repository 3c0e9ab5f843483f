use super::ledger::DedupLedger;
use crate::feed::types::ListingEntry;
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use std::fmt;

/// Publication timestamp layout used by the feed ("Wed, 02 Oct 2024 14:05:00 +0200").
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";
/// Layout parsed once the weekday prefix is dropped; the weekday is not checked.
const PUB_DATE_PARSE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

pub const DEFAULT_MAX_AGE_MINUTES: i64 = 30;

/// Gating parameters applied to every listing.
#[derive(Debug, Clone)]
pub struct QualificationCriteria {
    pub exclusion_keywords: Vec<String>,
    pub max_age_minutes: i64,
}

impl Default for QualificationCriteria {
    fn default() -> Self {
        Self {
            exclusion_keywords: Vec::new(),
            max_age_minutes: DEFAULT_MAX_AGE_MINUTES,
        }
    }
}

/// Why a listing did not get a bid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Stale,
    Duplicate,
    ExcludedKeyword(String),
    UnrecognizedBudget(String),
}

impl SkipReason {
    pub fn tag(&self) -> &'static str {
        match self {
            SkipReason::Stale => "stale",
            SkipReason::Duplicate => "duplicate",
            SkipReason::ExcludedKeyword(_) => "excluded-keyword",
            SkipReason::UnrecognizedBudget(_) => "unrecognized-budget",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ExcludedKeyword(k) => write!(f, "{} ({})", self.tag(), k),
            SkipReason::UnrecognizedBudget(p) => write!(f, "{} ({:?})", self.tag(), p),
            _ => f.write_str(self.tag()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Qualification {
    Eligible,
    Skip(SkipReason),
}

pub fn parse_pub_date(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    let raw = raw.trim();
    let body = match raw.split_once(',') {
        Some((weekday, rest)) if weekday.chars().all(|c| c.is_ascii_alphabetic()) => rest,
        _ => raw,
    };
    DateTime::parse_from_str(body.trim_start(), PUB_DATE_PARSE_FORMAT)
}

/// A listing is recent when it was published on the current calendar day and
/// no more than `max_age_minutes` ago. Both are judged in the publication's
/// own offset. Unparseable timestamps are never recent.
pub fn is_recent(raw_pub_date: &str, now: DateTime<Utc>, max_age_minutes: i64) -> bool {
    let published = match parse_pub_date(raw_pub_date) {
        Ok(dt) => dt,
        Err(e) => {
            tracing::debug!(pub_date = raw_pub_date, error = %e, "unparseable publication date");
            return false;
        }
    };
    let local_now = now.with_timezone(published.offset());
    let elapsed = local_now.signed_duration_since(published);

    // A window too large for TimeDelta is unbounded.
    published.date_naive() == local_now.date_naive()
        && TimeDelta::try_minutes(max_age_minutes).map_or(true, |max| elapsed <= max)
}

/// First configured keyword found verbatim in the title or the description.
pub fn excluded_keyword<'a>(entry: &ListingEntry, keywords: &'a [String]) -> Option<&'a str> {
    keywords
        .iter()
        .filter(|k| !k.is_empty())
        .find(|k| entry.title.contains(k.as_str()) || entry.description.contains(k.as_str()))
        .map(String::as_str)
}

/// Run recency, duplicate and keyword gates in that order; the first failure wins.
pub fn qualify(
    entry: &ListingEntry,
    ledger: &DedupLedger,
    criteria: &QualificationCriteria,
    now: DateTime<Utc>,
) -> Qualification {
    if !is_recent(&entry.published, now, criteria.max_age_minutes) {
        return Qualification::Skip(SkipReason::Stale);
    }
    if ledger.contains(&entry.identifier) {
        return Qualification::Skip(SkipReason::Duplicate);
    }
    if let Some(keyword) = excluded_keyword(entry, &criteria.exclusion_keywords) {
        return Qualification::Skip(SkipReason::ExcludedKeyword(keyword.to_string()));
    }
    Qualification::Eligible
}
