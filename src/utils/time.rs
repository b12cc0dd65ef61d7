use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 with millisecond precision and a `Z` suffix, the shape browsers
/// produce with `Date.toISOString()`.
pub fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn iso_matches_browser_format() {
        let dt = Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap();
        assert_eq!(to_iso(dt), "2025-01-01T10:00:00.000Z");
    }
}
