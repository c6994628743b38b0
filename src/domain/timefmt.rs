use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a backend timestamp into local wall-clock time.
///
/// Zoned values (RFC 3339) are converted to the local zone; naive values are
/// taken as already local, which is how the backend writes them.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
        return Some(zoned.with_timezone(&Local).naive_local());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// German short date-time, e.g. `17.10.2026, 14:05:09`.
pub fn format_de(dt: &NaiveDateTime) -> String {
    dt.format("%d.%m.%Y, %H:%M:%S").to_string()
}

/// Format a raw timestamp for display, falling back to the raw text.
pub fn display_timestamp(raw: Option<&str>) -> String {
    match raw {
        None => "Unbekannt".to_string(),
        Some(text) => parse_timestamp(text)
            .map(|dt| format_de(&dt))
            .unwrap_or_else(|| text.to_string()),
    }
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 9)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-05 14:07:09"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-05T14:07:09"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-05T14:07:09.123456").map(|d| d.format("%H:%M:%S").to_string()),
            Some("14:07:09".to_string())
        );
        assert!(parse_timestamp("2024-03-05T14:07:09Z").is_some());
        assert!(parse_timestamp("gestern").is_none());
    }

    #[test]
    fn formats_german_style() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(4, 7, 9)
            .unwrap();
        assert_eq!(format_de(&dt), "05.03.2024, 04:07:09");
        assert_eq!(display_timestamp(None), "Unbekannt");
        assert_eq!(display_timestamp(Some("bald")), "bald");
    }
}
