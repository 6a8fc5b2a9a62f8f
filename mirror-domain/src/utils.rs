use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};

pub fn current_unix_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Zero-padded UTC (year, month, day) of a unix timestamp.
pub fn date_parts(timestamp: i64) -> (String, String, String) {
    let date = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_default();
    (
        format!("{:04}", date.year()),
        format!("{:02}", date.month()),
        format!("{:02}", date.day()),
    )
}

/// Accepts `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM:SS`, interpreted as UTC.
pub fn parse_window_bound(value: &str) -> Result<i64> {
    let trimmed = value.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(datetime.and_utc().timestamp());
    }
    let date = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|err| anyhow!("invalid date '{}': {}", trimmed, err))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("invalid date '{}'", trimmed))?;
    Ok(midnight.and_utc().timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_parts_are_zero_padded_utc() {
        // 2024-03-05T23:30:00Z
        let (year, month, day) = date_parts(1_709_681_400);
        assert_eq!((year.as_str(), month.as_str(), day.as_str()), ("2024", "03", "05"));
    }

    #[test]
    fn window_bounds_accept_date_and_datetime() {
        assert_eq!(parse_window_bound("2018-01-01").expect("date"), 1_514_764_800);
        assert_eq!(
            parse_window_bound("2018-01-01T00:00:10").expect("datetime"),
            1_514_764_810
        );
        assert!(parse_window_bound("01/01/2018").is_err());
    }
}
