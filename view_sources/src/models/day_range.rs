//! Inclusive calendar-day ranges.
//!
//! Dates are plain calendar days in the pipeline's canonical time zone; the
//! conversion to instants happens at the store boundary, never here.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while building a [`DateRange`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("range of {days} days exceeds the limit of {max_days} days")]
    TooLong { days: i64, max_days: u32 },

    #[error("moving start date {start} back by {days} days leaves the calendar")]
    OutOfCalendar { start: NaiveDate, days: u32 },
}

/// `start..=end`, at least one day long.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Builds a range, rejecting `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if end < start {
            return Err(RangeError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a range and rejects it when it spans more than `max_days` days.
    pub fn bounded(start: NaiveDate, end: NaiveDate, max_days: u32) -> Result<Self, RangeError> {
        let range = Self::new(start, end)?;
        let days = range.len_days();
        if days > i64::from(max_days) {
            return Err(RangeError::TooLong { days, max_days });
        }
        Ok(range)
    }

    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days, both ends included.
    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Same end, start moved `days` earlier. Used to fetch the context a
    /// delta computation needs for the first requested day.
    pub fn extend_back(&self, days: u32) -> Result<Self, RangeError> {
        let start = self
            .start
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or(RangeError::OutOfCalendar { start: self.start, days })?;
        Ok(Self { start, end: self.end })
    }

    /// Every day in the range, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}
