//! Day-coverage bitmaps.
//!
//! A [`DayCoverage`] is a set of calendar days stored as a Roaring bitmap of
//! day ordinals (days since 0001-01-01, see [`Datelike::num_days_from_ce`]).
//! The reconciler uses it to answer "which days of the range does this source
//! cover" and "what is still missing" with set algebra instead of scans.
//!
//! Days before the common era have no ordinal and are never stored.

use chrono::{Datelike, NaiveDate};
use roaring::RoaringBitmap;
use view_sources::models::day_range::DateRange;

/// Ordinal of `day`, `None` for BCE dates.
pub fn day_ordinal(day: NaiveDate) -> Option<u32> {
    u32::try_from(day.num_days_from_ce()).ok()
}

/// Inverse of [`day_ordinal`].
pub fn day_from_ordinal(ordinal: u32) -> Option<NaiveDate> {
    i32::try_from(ordinal)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// A set of calendar days.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayCoverage {
    bits: RoaringBitmap,
}

impl DayCoverage {
    /// Empty coverage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every day of `range`.
    pub fn from_range(range: &DateRange) -> Self {
        range.days().collect()
    }

    /// Adds a day. Returns `true` if it was not already present.
    pub fn insert(&mut self, day: NaiveDate) -> bool {
        match day_ordinal(day) {
            Some(o) => self.bits.insert(o),
            None => false,
        }
    }

    /// Whether `day` is in the set.
    pub fn contains(&self, day: NaiveDate) -> bool {
        day_ordinal(day).is_some_and(|o| self.bits.contains(o))
    }

    /// Number of days.
    pub fn len(&self) -> u64 {
        self.bits.len()
    }

    /// True when no day is present.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Days present in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            bits: &self.bits & &other.bits,
        }
    }

    /// Removes every day of `other` from `self`.
    pub fn subtract(&mut self, other: &Self) {
        self.bits -= &other.bits;
    }

    /// Days in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.bits.iter().filter_map(day_from_ordinal)
    }
}

impl FromIterator<NaiveDate> for DayCoverage {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        let mut cov = Self::new();
        for day in iter {
            cov.insert(day);
        }
        cov
    }
}
