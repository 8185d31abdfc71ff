//! Wire date formatting for `x-amz-date`

use crate::error::{Result, StoreError};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// `EEE, dd MMM yyyy HH:mm:ss +0000`, always GMT, English day/month names
const AMZ_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S +0000";

/// Format a date in the wire form used by `x-amz-date` and the string-to-sign
///
/// Example: `Tue, 27 Mar 2007 19:36:42 +0000`
pub fn format_amz_date(date: &DateTime<Utc>) -> String {
    date.format(AMZ_DATE_FORMAT).to_string()
}

/// Current time in wire form
pub fn current_amz_date() -> String {
    format_amz_date(&Utc::now())
}

/// Parse a wire-form date back into UTC
pub fn parse_amz_date(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_str(text, "%a, %d %b %Y %H:%M:%S %z")
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidDate(format!("'{}': {}", text, e)))
}

/// Parse `text` as a GMT date using a chrono `pattern`
///
/// The text is never interpreted in the local time zone. Used to pin dates
/// captured from other S3 tools (e.g. `"%d %b %Y %H:%M:%S"`).
pub fn parse_gmt_date(text: &str, pattern: &str) -> Result<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text, pattern)
        .map_err(|e| StoreError::InvalidDate(format!("'{}' with '{}': {}", text, pattern, e)))?;
    Ok(Utc.from_utc_datetime(&naive))
}
