//! Timestamp helpers for Tracker payloads.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use super::error::{ApiError, Result};

/// Convert a legacy Tracker timestamp into a `YYYY-MM-DD` date.
///
/// Older Tracker payloads render times as `2009/01/01 12:00:00 UTC` (some
/// fields say `GMT` instead). Only the date part is kept.
///
/// # Errors
///
/// Returns `ApiError::InvalidInput` if the string is not in that shape.
pub fn tracker_datetime_to_ymd(value: &str) -> Result<String> {
    let invalid = || ApiError::InvalidInput(format!("not a Tracker datetime: '{}'", value));

    if !(value.ends_with("UTC") || value.ends_with("GMT")) {
        return Err(invalid());
    }

    let (date, rest) = value.split_once(' ').ok_or_else(invalid)?;
    if rest.is_empty() {
        return Err(invalid());
    }

    let parsed = NaiveDate::parse_from_str(date, "%Y/%m/%d").map_err(|_| invalid())?;
    // chrono accepts single-digit fields; the legacy format never emits them
    if date.len() != 10 {
        return Err(invalid());
    }

    Ok(parsed.format("%Y-%m-%d").to_string())
}

/// Render a timestamp the way the display strings show it.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
