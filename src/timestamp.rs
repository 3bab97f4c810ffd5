use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A date exactly as it may appear inside a stored document.
///
/// Documents written by older clients carry epoch milliseconds or plain
/// strings; everything written by this crate uses the native object form.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum StoredDate {
    /// `{"seconds": .., "nanoseconds": ..}`
    Native { seconds: i64, nanoseconds: u32 },
    /// Epoch milliseconds.
    Millis(i64),
    /// RFC 3339 date-time or a bare `YYYY-MM-DD`.
    Text(String),
}

#[derive(Debug, thiserror::Error)]
pub enum TimestampError {
    #[error("Unrecognized date string: {0:?}")]
    InvalidString(String),

    #[error("Timestamp out of range: {0}")]
    OutOfRange(i64),
}

impl StoredDate {
    /// Normalizes any stored representation to a UTC date-time.
    pub fn to_datetime(&self) -> Result<DateTime<Utc>, TimestampError> {
        match self {
            StoredDate::Native { seconds, nanoseconds } => Utc
                .timestamp_opt(*seconds, *nanoseconds)
                .single()
                .ok_or(TimestampError::OutOfRange(*seconds)),
            StoredDate::Millis(ms) => Utc
                .timestamp_millis_opt(*ms)
                .single()
                .ok_or(TimestampError::OutOfRange(*ms)),
            StoredDate::Text(s) => parse_text(s),
        }
    }
}

impl From<DateTime<Utc>> for StoredDate {
    fn from(dt: DateTime<Utc>) -> Self {
        StoredDate::Native {
            seconds: dt.timestamp(),
            nanoseconds: dt.timestamp_subsec_nanos(),
        }
    }
}

fn parse_text(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    parse_day(trimmed).map_err(|_| TimestampError::InvalidString(s.to_string()))
}

/// Parses `YYYY-MM-DD` into midnight UTC of that day.
pub fn parse_day(s: &str) -> Result<DateTime<Utc>, TimestampError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::InvalidString(s.to_string()))
}

/// Optional stored date that normalizes to `fallback` when absent.
pub fn or_now(stored: Option<&StoredDate>, fallback: DateTime<Utc>) -> Result<DateTime<Utc>, TimestampError> {
    match stored {
        Some(d) => d.to_datetime(),
        None => Ok(fallback),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn native_form_round_trips_through_json() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let json = serde_json::to_value(StoredDate::from(dt)).unwrap();
        assert_eq!(json["seconds"], dt.timestamp());
        let back: StoredDate = serde_json::from_value(json).unwrap();
        assert_eq!(back.to_datetime().unwrap(), dt);
    }

    #[test]
    fn all_representations_normalize_to_the_same_instant() {
        let expected = Utc.with_ymd_and_hms(2024, 11, 2, 0, 0, 0).unwrap();
        let inputs = [
            serde_json::json!({"seconds": expected.timestamp(), "nanoseconds": 0}),
            serde_json::json!(expected.timestamp_millis()),
            serde_json::json!("2024-11-02T00:00:00Z"),
            serde_json::json!("2024-11-02"),
        ];
        for input in inputs {
            let stored: StoredDate = serde_json::from_value(input.clone()).unwrap();
            assert_eq!(stored.to_datetime().unwrap(), expected, "input {input}");
        }
    }

    #[test]
    fn offset_strings_are_converted_to_utc() {
        let stored = StoredDate::Text("2024-06-01T23:30:00-02:00".into());
        let dt = stored.to_datetime().unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());
        assert_eq!(dt.hour(), 1);
    }

    #[test]
    fn garbage_text_is_rejected() {
        let stored = StoredDate::Text("next tuesday".into());
        assert!(matches!(stored.to_datetime(), Err(TimestampError::InvalidString(_))));
    }

    #[test]
    fn missing_date_uses_fallback() {
        let now = Utc::now();
        assert_eq!(or_now(None, now).unwrap(), now);
    }
}
