// Selection reasons — a one-line explanation of why a paper made the digest.
//
// Built from the same raw fields as the score (never from the score itself)
// so every clause can be traced back to a signal. Observations are checked
// in a fixed priority order and the first two that pass are shown.
//
// A missing publication date counts as 30 days old here, not as "now" like
// in the score formula. The two fallbacks are kept apart because unifying
// them changes which reasons are emitted.

use chrono::{DateTime, Utc};

use super::clock::{parse_publication_date, whole_days_between};
use crate::db::models::PaperRecord;

pub const REASON_PREFIX: &str = "Selected for: ";
pub const FALLBACK_REASON: &str = "Selected for: emerging research with growing interest";

/// Days assumed when the publication date is unknown.
pub const UNKNOWN_DATE_DAYS: i64 = 30;

/// Maximum number of observations joined into one reason.
pub const MAX_OBSERVATIONS: usize = 2;

const VELOCITY_WINDOW_DAYS: i64 = 60;
const VELOCITY_THRESHOLD: f64 = 5.0;
const INFLUENTIAL_RATIO_THRESHOLD: f64 = 0.3;
const THIS_WEEK_DAYS: i64 = 7;
const LAST_TWO_WEEKS_DAYS: i64 = 14;
const HIGH_CITATIONS: u64 = 50;

/// Days since publication, at least 1.
///
/// A missing date counts as `UNKNOWN_DATE_DAYS`. A date that is present but
/// unparsable counts as "now", like in the score formula, so it yields 1.
pub fn days_since_publication(publication_date: Option<&str>, now: DateTime<Utc>) -> i64 {
    match publication_date.map(str::trim).filter(|raw| !raw.is_empty()) {
        None => UNKNOWN_DATE_DAYS,
        Some(raw) => parse_publication_date(raw)
            .map_or(0, |published| whole_days_between(now, published))
            .max(1),
    }
}

/// Every qualifying observation, highest priority first.
pub fn observations(paper: &PaperRecord, now: DateTime<Utc>) -> Vec<String> {
    let citations = paper.citation_count;
    let influential = paper.influential_citation_count;
    let days = days_since_publication(paper.publication_date.as_deref(), now);

    let mut found = Vec::new();

    if citations > 0 && days < VELOCITY_WINDOW_DAYS {
        let velocity = citations as f64 / (days as f64 / 30.0);
        if velocity > VELOCITY_THRESHOLD {
            found.push(format!("{citations} citations in {days} days"));
        }
    }

    if influential > 0 && citations > 0 {
        let ratio = influential as f64 / citations as f64;
        if ratio > INFLUENTIAL_RATIO_THRESHOLD {
            found.push(format!("{influential} influential citations"));
        }
    }

    if days <= THIS_WEEK_DAYS {
        found.push("published this week".to_string());
    } else if days <= LAST_TWO_WEEKS_DAYS {
        found.push("published in last 2 weeks".to_string());
    }

    if citations >= HIGH_CITATIONS {
        found.push(format!("{citations} total citations"));
    }

    found
}

/// The reason string shown next to a selected paper.
pub fn selection_reason(paper: &PaperRecord, now: DateTime<Utc>) -> String {
    let found = observations(paper, now);
    if found.is_empty() {
        return FALLBACK_REASON.to_string();
    }
    let shown: Vec<&str> = found
        .iter()
        .take(MAX_OBSERVATIONS)
        .map(String::as_str)
        .collect();
    format!("{REASON_PREFIX}{}", shown.join(", "))
}
