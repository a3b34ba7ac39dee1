//! # Calendar Module
//!
//! Whole-week date ranges.
//!
//! A project's dates are snapped outward to full calendar weeks before any
//! capacity math: the start moves back to the Monday of its week and the end
//! moves forward to the Sunday of its week. A roster week column belongs to
//! the range when its week-start date lies inside `[start, end]`.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RosterFitError;

/// Monday of the week containing `date`.
///
/// Returns `None` only at the lower edge of the representable calendar.
#[must_use]
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    let back = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(back))
}

/// Sunday of the week containing `date`.
///
/// Returns `None` only at the upper edge of the representable calendar.
#[must_use]
pub fn week_end(date: NaiveDate) -> Option<NaiveDate> {
    let forward = 6 - u64::from(date.weekday().num_days_from_monday());
    date.checked_add_days(Days::new(forward))
}

/// A date range normalized to whole calendar weeks.
///
/// Invariant: `start` is a Monday, `end` is a Sunday and `start <= end`.
/// The only way to build one is through [`WeekRange::new`] (deserialization
/// goes through it as well), so the invariant always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWeekRange")]
pub struct WeekRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawWeekRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawWeekRange> for WeekRange {
    type Error = RosterFitError;

    fn try_from(raw: RawWeekRange) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl WeekRange {
    /// Normalize `[start, end]` to whole weeks.
    ///
    /// # Errors
    /// `InvalidWeekRange` when the snapped start falls after the snapped end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RosterFitError> {
        let invalid = || RosterFitError::InvalidWeekRange { start, end };
        let snapped_start = week_start(start).ok_or_else(invalid)?;
        let snapped_end = week_end(end).ok_or_else(invalid)?;

        if snapped_start > snapped_end {
            return Err(invalid());
        }

        Ok(Self {
            start: snapped_start,
            end: snapped_end,
        })
    }

    /// Monday the range begins on.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Sunday the range ends on.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether a week-start date falls inside the range.
    #[must_use]
    pub fn contains(&self, week: NaiveDate) -> bool {
        self.start <= week && week <= self.end
    }

    /// Number of calendar weeks spanned, independent of any roster.
    #[must_use]
    pub fn calendar_weeks(&self) -> u64 {
        let days = (self.end - self.start).num_days() + 1;
        (days / 7) as u64
    }
}

impl fmt::Display for WeekRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}
