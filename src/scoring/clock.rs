// Injected "current time" for the scorer and the reason generator.
//
// A run takes a single snapshot from the clock and hands it to every call,
// so one batch is scored against one instant and tests can pin the date.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stuck at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Midnight UTC on the given date. Returns None for an invalid date.
    pub fn at_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self(date.and_hms_opt(0, 0, 0)?.and_utc()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Parse a publication date as the literature API and storage hand it over.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 (offset dropped, wall-clock value kept)
/// and naive `YYYY-MM-DD[T ]HH:MM[:SS[.f]]`. Anything else is None.
pub fn parse_publication_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// The instant `days` whole days before `now`, used as a window cutoff.
///
/// Windows too wide to represent start at the earliest representable time.
pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Whole days from `published` to `now`, floored. Negative for future dates.
pub fn whole_days_between(now: DateTime<Utc>, published: NaiveDateTime) -> i64 {
    let delta = now.naive_utc() - published;
    let days = delta.num_days();
    // num_days truncates toward zero; a partial negative day counts as -1.
    if delta < Duration::days(days) {
        days - 1
    } else {
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        let dt = parse_publication_date("2026-01-15").unwrap();
        assert_eq!(dt.to_string(), "2026-01-15 00:00:00");
    }

    #[test]
    fn test_parse_rfc3339_keeps_wall_clock() {
        let dt = parse_publication_date("2026-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.to_string(), "2026-01-15 10:30:00");
        let dt = parse_publication_date("2026-01-15T10:30:00+09:00").unwrap();
        assert_eq!(dt.to_string(), "2026-01-15 10:30:00");
    }

    #[test]
    fn test_parse_without_seconds() {
        let dt = parse_publication_date("2025-01-15T10:30").unwrap();
        assert_eq!(dt.to_string(), "2025-01-15 10:30:00");
        let dt = parse_publication_date("2025-01-15 10:30").unwrap();
        assert_eq!(dt.to_string(), "2025-01-15 10:30:00");
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_publication_date("").is_none());
        assert!(parse_publication_date("last tuesday").is_none());
        assert!(parse_publication_date("2026-13-45").is_none());
    }

    #[test]
    fn test_days_before() {
        let now = FixedClock::at_date(2026, 3, 1).unwrap().now();
        assert_eq!(days_before(now, 7).to_string(), "2026-02-22 00:00:00 UTC");
        assert_eq!(days_before(now, 0), now);
        assert_eq!(days_before(now, i64::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_whole_days_floors() {
        let now = FixedClock::at_date(2026, 3, 1).unwrap().now();
        let published = parse_publication_date("2026-02-20T12:00:00").unwrap();
        // 8.5 days
        assert_eq!(whole_days_between(now, published), 8);

        let future = parse_publication_date("2026-03-01T12:00:00").unwrap();
        assert_eq!(whole_days_between(now, future), -1);
    }
}
