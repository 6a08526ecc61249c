//! Timestamp normalization for upstream capture records.
//!
//! The capture agent writes RFC 3339 timestamps with anywhere from zero
//! to nine fractional digits, terminated either by a literal `Z` or a
//! numeric UTC offset. Normalization tries a fixed ordered list of
//! format patterns; if none match, the fractional part is truncated to
//! microsecond precision and the list is retried. A string that still
//! fails yields a typed [`TimestampError`]: callers drop the record
//! rather than inventing a substitute instant.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::TimestampError;

/// Formats with a literal UTC `Z` marker, tried first.
const UTC_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ"];

/// Formats with a numeric offset (`+08:00` / `-0700`).
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M:%S%:z"];

/// Parses a timestamp string into a canonical UTC instant.
pub fn normalize(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    if let Some(ts) = try_formats(raw) {
        return Ok(ts);
    }

    // Retry with sub-microsecond digits dropped.
    if let Some(truncated) = truncate_subseconds(raw) {
        if let Some(ts) = try_formats(&truncated) {
            return Ok(ts);
        }
    }

    Err(TimestampError::Unparseable(raw.to_string()))
}

fn try_formats(s: &str) -> Option<DateTime<Utc>> {
    for fmt in UTC_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    None
}

/// Truncates the fractional-seconds component to 6 digits, preserving any
/// trailing timezone marker. Returns `None` when there is nothing to drop.
fn truncate_subseconds(raw: &str) -> Option<String> {
    let (head, tail) = raw.split_once('.')?;
    let frac_end = tail
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(tail.len());
    let (digits, tz) = tail.split_at(frac_end);
    if digits.len() <= 6 {
        return None;
    }
    Some(format!("{}.{}{}", head, &digits[..6], tz))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_utc_second_precision() {
        let ts = normalize("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(ts.timestamp(), 1714557600);
        assert_eq!(ts.nanosecond(), 0);
    }

    #[test]
    fn test_parse_utc_fractional_precisions() {
        for (raw, nanos) in [
            ("2024-05-01T10:00:00.5Z", 500_000_000),
            ("2024-05-01T10:00:00.123Z", 123_000_000),
            ("2024-05-01T10:00:00.123456Z", 123_456_000),
            ("2024-05-01T10:00:00.123456789Z", 123_456_789),
        ] {
            let ts = normalize(raw).unwrap();
            assert_eq!(ts.nanosecond(), nanos, "for {}", raw);
        }
    }

    #[test]
    fn test_parse_numeric_offset() {
        // 10:00 at +08:00 is 02:00 UTC.
        let ts = normalize("2024-05-01T10:00:00+08:00").unwrap();
        assert_eq!(ts.hour(), 2);

        let with_frac = normalize("2024-05-01T10:00:00.25-05:00").unwrap();
        assert_eq!(with_frac.hour(), 15);
        assert_eq!(with_frac.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_truncation_fallback() {
        // 12 fractional digits exceed chrono's nanosecond field; the
        // truncation retry keeps the first 6.
        let ts = normalize("2024-05-01T10:00:00.123456789012Z").unwrap();
        assert_eq!(ts.nanosecond(), 123_456_000);

        let with_tz = normalize("2024-05-01T10:00:00.999999999999+08:00").unwrap();
        assert_eq!(with_tz.nanosecond(), 999_999_000);
    }

    #[test]
    fn test_unparseable_is_typed_error() {
        for raw in ["", "not a timestamp", "2024/05/01 10:00:00", "1714557600"] {
            match normalize(raw) {
                Err(TimestampError::Unparseable(s)) => assert_eq!(s, raw),
                other => panic!("expected Unparseable for {:?}, got {:?}", raw, other),
            }
        }
    }

    #[test]
    fn test_truncate_subseconds_helper() {
        assert_eq!(
            truncate_subseconds("2024-05-01T10:00:00.123456789012Z").as_deref(),
            Some("2024-05-01T10:00:00.123456Z")
        );
        // Already at or below microsecond precision: nothing to do.
        assert_eq!(truncate_subseconds("2024-05-01T10:00:00.123Z"), None);
        assert_eq!(truncate_subseconds("2024-05-01T10:00:00Z"), None);
    }
}
