//! Time source and timestamp encoding.
//!
//! Every component that reads "now" takes an `Arc<dyn Clock>` so tests can
//! pin or advance time instead of sleeping.

use std::sync::Mutex;

use chrono::{Datelike, DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

/// Source of the current UTC instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(truncate_millis(start)),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|p| p.into_inner()) = truncate_millis(to);
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Encode an instant as fixed-width RFC 3339 UTC with millisecond precision,
/// e.g. `2025-08-02T10:00:00.000Z`.
///
/// Fixed width keeps lexicographic order equal to chronological order, which
/// the SQL `execute_at <= ?` polling query relies on.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Date-time layouts without an offset, tried in order and taken as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse an ISO-8601 timestamp.
///
/// Accepts full RFC 3339 (any offset), minute precision with or without an
/// offset, a date-time without offset (taken as UTC), or a bare date
/// (midnight UTC). The result is truncated to milliseconds so it survives a
/// round trip through storage unchanged. Instants outside years 0000..=9999
/// are rejected; see [`is_storable`].
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_iso8601(s.trim())?;
    is_storable(&parsed).then(|| truncate_millis(parsed))
}

/// Whether `ts` encodes to the fixed-width four-digit-year form.
///
/// Five-digit and negative years format with a sign prefix, which breaks
/// lexicographic ordering in SQL and cannot be read back as RFC 3339.
pub fn is_storable(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

fn parse_iso8601(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = s.strip_suffix(['Z', 'z']).unwrap_or(s);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// Drop sub-millisecond precision.
pub fn truncate_millis(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ts.timestamp_millis()).unwrap_or(ts)
}
