//! Fixed-format UTC timestamps at the persistence boundary.
//!
//! All timestamps are stored as `YYYY-MM-DDTHH:MM:SS.mmmZ` — millisecond
//! precision, human-readable, and lexicographically sortable. This is the
//! single serialize/parse pair for the whole crate; everything above the
//! store boundary works with `chrono::DateTime<Utc>`.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::errors::{MetaError, MetaResult};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Render a timestamp in the canonical persisted form.
pub(crate) fn to_text(ts: &DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// Parse a timestamp previously written by [`to_text`].
pub(crate) fn from_text(text: &str) -> MetaResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, FORMAT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|_| MetaError::Timestamp(text.to_string()))
}

/// Current time truncated to millisecond precision, so that a freshly
/// stamped entity round-trips exactly through the text encoding.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_exactly_at_millisecond_precision() {
        let ts = now_millis();
        let text = to_text(&ts);
        assert_eq!(from_text(&text).unwrap(), ts);
    }

    #[test]
    fn format_is_fixed_width_and_sortable() {
        let a = DateTime::<Utc>::from_timestamp_millis(1_700_000_000_007).unwrap();
        let b = DateTime::<Utc>::from_timestamp_millis(1_700_000_123_456).unwrap();
        let (ta, tb) = (to_text(&a), to_text(&b));
        assert_eq!(ta, "2023-11-14T22:13:20.007Z");
        assert_eq!(ta.len(), tb.len());
        assert!(ta < tb);
    }

    #[test]
    fn rejects_garbage() {
        assert!(from_text("not-a-timestamp").is_err());
        assert!(from_text("2023-13-99T22:13:20.000Z").is_err());
    }
}
