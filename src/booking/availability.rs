//! Date ranges and the vehicle availability check
//!
//! Ranges are inclusive whole calendar days. Two ranges `[a0, a1]` and
//! `[b0, b1]` overlap when `a0 <= b1 && b0 <= a1`, so a rental ending on
//! the 12th conflicts with one starting on the 12th.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::rental::Rental,
};

/// Inclusive calendar-day range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(AppError::Validation(format!(
                "End date {} is before start date {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of billable days; a same-day rental counts as one
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// First rental (by start date) that still holds an overlapping range.
///
/// Callers pass the rentals of a single vehicle; cancelled rentals are skipped.
/// Linear in the number of rentals, which is fine at catalog scale.
pub fn find_conflict<'a, I>(candidate: &DateRange, rentals: I) -> Option<&'a Rental>
where
    I: IntoIterator<Item = &'a Rental>,
{
    rentals
        .into_iter()
        .filter(|r| r.status.blocks_vehicle())
        .filter(|r| r.range().overlaps(candidate))
        .min_by_key(|r| (r.start_date, r.id))
}

/// Fail with `AvailabilityConflict` when the candidate range is taken
pub fn ensure_available<'a, I>(candidate: &DateRange, rentals: I) -> AppResult<()>
where
    I: IntoIterator<Item = &'a Rental>,
{
    match find_conflict(candidate, rentals) {
        Some(conflict) => Err(AppError::AvailabilityConflict {
            rental_id: conflict.id,
            start_date: conflict.start_date,
            end_date: conflict.end_date,
        }),
        None => Ok(()),
    }
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp into a calendar date.
/// Timestamps keep the date as written in their own offset; the time of day is dropped.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .map_err(|_| format!("Invalid date: {}", value))
}

/// Serde adapter for [`parse_calendar_date`]
pub fn deserialize_calendar_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_calendar_date(&raw).map_err(serde::de::Error::custom)
}

/// Optional variant of [`deserialize_calendar_date`]
pub fn deserialize_optional_calendar_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| parse_calendar_date(&raw).map_err(serde::de::Error::custom))
        .transpose()
}
