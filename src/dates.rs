//! Date parsing, validation, and time-window helpers.
//!
//! All times are naive UTC. Callers pass dates either as a plain day
//! (`2020-02-01`) or as a date and time (`2020-02-01T10:00:00`); a plain day
//! means midnight.

use chrono::{Duration, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::ValidationError;

/// Formats accepted for a date with a time component.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Format for a plain day.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format used when passing timestamps to upstream APIs.
pub const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Current UTC time in RFC 3339 format with whole seconds, e.g.
/// `2020-02-02T10:00:03+00:00`.
pub fn time_now() -> String {
    Utc::now()
        .trunc_subsecs(0)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Current UTC time as a naive datetime, truncated to whole seconds.
pub fn date_today() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

/// Parse a date string into a datetime.
///
/// Accepts `YYYY-MM-DD` and `YYYY-MM-DDTHH:MM:SS` (a space separator and
/// fractional seconds are tolerated).
pub fn validate_date(date: &str) -> Result<NaiveDateTime, ValidationError> {
    let trimmed = date.trim();

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }

    if let Ok(day) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(day.and_time(chrono::NaiveTime::MIN));
    }

    warn!(date = %date, "Invalid date");
    Err(ValidationError::InvalidDate(date.to_string()))
}

/// Epoch seconds (UTC) for a pair of datetimes.
pub fn time_epoch(since: NaiveDateTime, until: NaiveDateTime) -> (i64, i64) {
    (since.and_utc().timestamp(), until.and_utc().timestamp())
}

/// A validated `(since, until)` time window with `since <= until`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub since: NaiveDateTime,
    pub until: NaiveDateTime,
}

impl TimeWindow {
    /// Build a window, rejecting an inverted range.
    pub fn new(since: NaiveDateTime, until: NaiveDateTime) -> Result<Self, ValidationError> {
        if since > until {
            return Err(ValidationError::InvertedRange {
                since: since.format(ISO_FORMAT).to_string(),
                until: until.format(ISO_FORMAT).to_string(),
            });
        }
        Ok(Self { since, until })
    }

    /// Parse an optional pair of date strings.
    ///
    /// A missing `until` defaults to `now`; a missing `since` defaults to one
    /// day before `until`.
    pub fn parse(
        since: Option<&str>,
        until: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Self, ValidationError> {
        let until = match until {
            Some(raw) => validate_date(raw)?,
            None => now,
        };
        let since = match since {
            Some(raw) => validate_date(raw)?,
            None => until
                .checked_sub_signed(Duration::days(1))
                .ok_or_else(|| {
                    warn!(until = %until, "No day before the end of the window");
                    ValidationError::InvalidDate(until.format(ISO_FORMAT).to_string())
                })?,
        };
        Self::new(since, until)
    }

    /// The window as epoch seconds.
    pub fn epochs(&self) -> (i64, i64) {
        time_epoch(self.since, self.until)
    }

    /// The window widened to whole days: midnight of each end's day.
    pub fn day_bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.since.date().and_time(chrono::NaiveTime::MIN),
            self.until.date().and_time(chrono::NaiveTime::MIN),
        )
    }

    /// Both ends formatted as `YYYY-MM-DDTHH:MM:SS`.
    pub fn iso_bounds(&self) -> (String, String) {
        (
            self.since.format(ISO_FORMAT).to_string(),
            self.until.format(ISO_FORMAT).to_string(),
        )
    }
}
