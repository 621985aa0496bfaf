//! Date parsing and calendar features

use super::table::ColumnData;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%b %d %Y",
];

/// Parse a date or date-time string; `None` when no known format fits
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Calendar month (1-12) for every row. Unparseable values become `None`.
///
/// Numeric columns are read as `YYYYMMDD` integers.
pub fn months(data: &ColumnData) -> Vec<Option<f64>> {
    match data {
        ColumnData::Text(values) => values
            .iter()
            .map(|v| v.as_deref().and_then(parse_datetime).map(|dt| dt.month() as f64))
            .collect(),
        ColumnData::Numeric(values) => values
            .iter()
            .map(|v| {
                v.filter(|x| x.fract() == 0.0 && *x >= 10_000_101.0 && *x <= 99_991_231.0)
                    .and_then(|x| NaiveDate::parse_from_str(&format!("{}", x as i64), "%Y%m%d").ok())
                    .map(|d| d.month() as f64)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        for raw in [
            "2024-03-15",
            "2024/03/15",
            "03/15/2024",
            "2024-03-15 08:30:00",
            "2024-03-15T08:30:00.250",
            "2024-03-15T08:30:00Z",
            "2024-03-15 08:30:00.000000",
        ] {
            let dt = parse_datetime(raw).unwrap_or_else(|| panic!("failed to parse {raw}"));
            assert_eq!(dt.month(), 3, "{raw}");
        }
    }

    #[test]
    fn test_parse_failure() {
        assert!(parse_datetime("not a date").is_none());
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("2024-13-45").is_none());
    }

    #[test]
    fn test_months_from_text() {
        let data = ColumnData::Text(vec![
            Some("2023-01-31".into()),
            None,
            Some("garbage".into()),
            Some("2023-12-01".into()),
        ]);
        assert_eq!(months(&data), vec![Some(1.0), None, None, Some(12.0)]);
    }

    #[test]
    fn test_months_from_numeric() {
        let data = ColumnData::Numeric(vec![Some(20240705.0), Some(3.0), None]);
        assert_eq!(months(&data), vec![Some(7.0), None, None]);
    }
}
