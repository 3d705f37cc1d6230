//! Date and datetime ranges bounding a request.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::VolcurveError;

/// Datetime format accepted on the command line and in request parameters.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Date format used by historical requests.
pub const GATEWAY_DATE_FORMAT: &str = "%Y%m%d";

/// A range of dates for a historical request.
///
/// The range is not validated; the gateway rejects a start after the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new date range.
    #[must_use]
    pub const fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Returns true if the range contains the given date.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Returns the start date in gateway format (`YYYYMMDD`).
    #[must_use]
    pub fn start_param(&self) -> String {
        self.start.format(GATEWAY_DATE_FORMAT).to_string()
    }

    /// Returns the end date in gateway format (`YYYYMMDD`).
    #[must_use]
    pub fn end_param(&self) -> String {
        self.end.format(GATEWAY_DATE_FORMAT).to_string()
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// A range of naive local datetimes for an intraday request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start datetime, local wall clock.
    pub start: NaiveDateTime,
    /// End datetime, local wall clock.
    pub end: NaiveDateTime,
}

impl TimeRange {
    /// Creates a new time range.
    #[must_use]
    pub const fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Parses a time range from two `YYYY-MM-DDTHH:MM:SS` strings.
    ///
    /// # Errors
    ///
    /// Returns an error if either string is malformed.
    pub fn parse(start: &str, end: &str) -> Result<Self, VolcurveError> {
        Ok(Self::new(parse_datetime(start)?, parse_datetime(end)?))
    }

    /// Converts the range to UTC using the given local offset.
    ///
    /// # Errors
    ///
    /// Returns [`VolcurveError::InvalidDateTime`] if either bound leaves the
    /// representable range once shifted.
    pub fn to_utc(&self, offset: FixedOffset) -> Result<Self, VolcurveError> {
        Ok(Self::new(local_to_utc(self.start, offset)?, local_to_utc(self.end, offset)?))
    }

    /// Returns true if the range contains the given datetime.
    #[must_use]
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        at >= self.start && at <= self.end
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(DATETIME_FORMAT),
            self.end.format(DATETIME_FORMAT)
        )
    }
}

/// Parses a `YYYY-MM-DDTHH:MM:SS` datetime (no fractional seconds).
///
/// # Errors
///
/// Returns [`VolcurveError::InvalidDateTime`] if the string is malformed.
pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, VolcurveError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .map_err(|e| VolcurveError::InvalidDateTime(format!("{s}: {e}")))
}

/// Parses a date in either `YYYY-MM-DD` or `YYYYMMDD` form.
///
/// # Errors
///
/// Returns [`VolcurveError::InvalidDateTime`] if neither form matches.
pub fn parse_date(s: &str) -> Result<NaiveDate, VolcurveError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, GATEWAY_DATE_FORMAT))
        .map_err(|e| VolcurveError::InvalidDateTime(format!("{s}: {e}")))
}

fn offset_delta(offset: FixedOffset) -> TimeDelta {
    TimeDelta::seconds(i64::from(offset.local_minus_utc()))
}

/// Shifts a local wall-clock time to UTC.
///
/// # Errors
///
/// Returns [`VolcurveError::InvalidDateTime`] if the result is out of range.
pub fn local_to_utc(local: NaiveDateTime, offset: FixedOffset) -> Result<NaiveDateTime, VolcurveError> {
    local
        .checked_sub_signed(offset_delta(offset))
        .ok_or_else(|| VolcurveError::InvalidDateTime(format!("{local} at {offset} has no UTC equivalent")))
}

/// Shifts a UTC time to local wall clock.
///
/// # Errors
///
/// Returns [`VolcurveError::InvalidDateTime`] if the result is out of range.
pub fn utc_to_local(utc: NaiveDateTime, offset: FixedOffset) -> Result<NaiveDateTime, VolcurveError> {
    utc.checked_add_signed(offset_delta(offset))
        .ok_or_else(|| VolcurveError::InvalidDateTime(format!("{utc} UTC has no local time at {offset}")))
}
