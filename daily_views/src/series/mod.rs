//! Layered daily-series sources.
//!
//! Every upstream is wrapped in a [`DailySeriesProvider`] that turns its raw
//! rows or samples into one [`DayFigure`] per covered canonical day. The
//! reconciler holds a ranked list of providers and never looks at raw data.
//!
//! - [`batch::BatchSeriesProvider`]: authoritative warehouse totals.
//! - [`realtime::RealtimeSeriesProvider`]: deltas of real-time cumulative
//!   counters; fills days nothing else covers.

pub mod batch;
pub mod realtime;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use view_sources::{
    models::{day_range::DateRange, writer::WriterIdentity},
    providers::ProviderError,
};

use crate::{
    coverage::DayCoverage,
    models::{DataAnomaly, ViewSource},
};

/// A provider's figure for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayFigure {
    /// Views attributed to the day.
    pub views: u64,
    /// The source's running total at the end of the day, when it has one.
    pub end_cumulative: Option<u64>,
}

impl DayFigure {
    /// Figure with an optional running total.
    pub const fn new(views: u64, end_cumulative: Option<u64>) -> Self {
        Self { views, end_cumulative }
    }
}

/// Per-day figures from one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSeries {
    /// Covered days only. A missing key means "no data", not zero.
    pub days: BTreeMap<NaiveDate, DayFigure>,
    /// Clamped negative deltas seen while building the figures.
    pub anomalies: Vec<DataAnomaly>,
}

impl SourceSeries {
    /// Days this series has a figure for.
    pub fn coverage(&self) -> DayCoverage {
        self.days.keys().copied().collect()
    }

    /// Figure for `day`, if covered.
    pub fn get(&self, day: NaiveDate) -> Option<&DayFigure> {
        self.days.get(&day)
    }
}

/// One ranked source of daily view figures.
#[async_trait]
pub trait DailySeriesProvider: Send + Sync {
    /// Tag carried by every point this provider contributes.
    fn source(&self) -> ViewSource;

    /// Whether days no provider covers may be filled from this one as zero.
    ///
    /// Only a source that observes every day (a live counter) can claim that
    /// an uncovered day had no views.
    fn fills_gaps(&self) -> bool {
        false
    }

    /// Figures for the days of `range` this source covers.
    async fn daily_series(
        &self,
        writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<SourceSeries, ProviderError>;
}
