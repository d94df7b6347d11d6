// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-width UTC timestamp text used by every stored row.
//!
//! All rows use the same millisecond-precision `Z` format, so lexical order
//! equals chronological order and range filters are string comparisons.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format an instant for storage.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(FORMAT).to_string()
}

/// Parse a stored timestamp. Returns `None` for text not written by [`format_timestamp`].
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// `[start, end)` bounds of a UTC calendar day, formatted for storage.
pub fn day_bounds(date: NaiveDate) -> (String, String) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start + chrono::Duration::days(1);
    (format_timestamp(start), format_timestamp(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_fixed_width_millis() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(format_timestamp(at), "2026-03-01T09:05:07.000Z");
    }

    #[test]
    fn parse_inverts_format() {
        let at = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(at)), Some(at));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn lexical_order_is_chronological() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 9, 23, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 10, 1, 0, 0).unwrap();
        assert!(format_timestamp(earlier) < format_timestamp(later));
    }

    #[test]
    fn day_bounds_span_one_day() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        let (start, end) = day_bounds(date);
        assert_eq!(start, "2026-02-28T00:00:00.000Z");
        assert_eq!(end, "2026-03-01T00:00:00.000Z");
    }
}
