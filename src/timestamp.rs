//! ISO-8601 timestamp handling for store values and evaluation times.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("malformed timestamp '{0}'")]
    Malformed(String),
    #[error("time window around {0} falls outside the supported date range")]
    OutOfRange(DateTime<Utc>),
}

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parses a store timestamp into UTC.
///
/// Accepts `Z`-suffixed and offset-suffixed RFC 3339 strings, and zone-less
/// ISO strings which are taken to be UTC already.
///
/// # Errors
///
/// Returns [`TimestampError`] if the string matches none of those forms.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampError::Malformed(raw.to_string()))
}

pub fn is_valid_timestamp(raw: &str) -> bool {
    parse_timestamp(raw).is_ok()
}

/// Canonical form used for query bounds.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Half-open interval `[start, end)` unless built with [`TimeWindow::around`],
/// which is closed on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `center ± minutes`.
    ///
    /// # Errors
    ///
    /// [`TimestampError::OutOfRange`] when either bound leaves chrono's date range.
    pub fn around(center: DateTime<Utc>, minutes: i64) -> Result<Self, TimestampError> {
        let half = TimeDelta::try_minutes(minutes).ok_or(TimestampError::OutOfRange(center))?;
        Ok(Self {
            start: shift_back(center, half)?,
            end: center
                .checked_add_signed(half)
                .ok_or(TimestampError::OutOfRange(center))?,
        })
    }

    /// From `days` before `anchor` up to `until`.
    pub fn trailing(
        anchor: DateTime<Utc>,
        days: i64,
        until: DateTime<Utc>,
    ) -> Result<Self, TimestampError> {
        Ok(Self {
            start: days_before(anchor, days)?,
            end: until,
        })
    }

    pub fn start_str(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_str(&self) -> String {
        format_timestamp(&self.end)
    }
}

/// `anchor` minus `days` whole days, without overflowing.
pub fn days_before(anchor: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, TimestampError> {
    let delta = TimeDelta::try_days(days).ok_or(TimestampError::OutOfRange(anchor))?;
    shift_back(anchor, delta)
}

fn shift_back(anchor: DateTime<Utc>, delta: TimeDelta) -> Result<DateTime<Utc>, TimestampError> {
    anchor
        .checked_sub_signed(delta)
        .ok_or(TimestampError::OutOfRange(anchor))
}
