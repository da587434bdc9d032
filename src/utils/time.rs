//! Timestamp and duration formatting for report fields

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use mongodb::bson;

/// Convert a BSON datetime to a chrono UTC timestamp.
///
/// Values outside chrono's range clamp to the epoch; the store never
/// produces those for activity records.
pub fn to_utc(value: bson::DateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(value.timestamp_millis()).unwrap_or(DateTime::UNIX_EPOCH)
}

/// RFC 3339 rendering in UTC, second precision
pub fn format_utc(value: bson::DateTime) -> String {
    to_utc(value).format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// RFC 3339 rendering in a fixed offset, second precision
pub fn format_in_offset(value: bson::DateTime, offset: FixedOffset) -> String {
    to_utc(value)
        .with_timezone(&offset)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

/// Truncate a timestamp to the start of its UTC hour
pub fn hour_bucket(value: bson::DateTime) -> DateTime<Utc> {
    let ts = to_utc(value);
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

pub fn format_hour(bucket: DateTime<Utc>) -> String {
    bucket.format("%Y-%m-%dT%H:00:00Z").to_string()
}

/// Render an elapsed span as `<days>d <hh>:<mm>:<ss>`
pub fn format_duration_millis(millis: i64) -> String {
    let total_secs = millis.max(0) / 1000;
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let seconds = total_secs % 60;
    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}
