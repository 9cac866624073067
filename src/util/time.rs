use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M:%S %z",
];

// Parse a feed timestamp in any of the formats seen in the wild
// (RFC 2822, RFC 3339, ISO-8601 with or without offset, bare dates).
// Naive timestamps are taken as UTC. Returns None if unparseable.
pub fn parse_feed_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // "...Z" without a full RFC 3339 shape, e.g. "2024-05-01T10:00Z"
    let naive_src = s.strip_suffix('Z').unwrap_or(s);
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(naive_src, fmt) {
            return Some(ndt.and_utc());
        }
    }
    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return nd.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    None
}

/// Inclusive recency check; undated items always pass.
pub fn within_days(published: Option<DateTime<Utc>>, days: i64, now: DateTime<Utc>) -> bool {
    let Some(published) = published else { return true };
    // a window reaching past chrono's range covers every dated item
    match Duration::try_days(days).and_then(|d| now.checked_sub_signed(d)) {
        Some(cutoff) => published >= cutoff,
        None => true,
    }
}
