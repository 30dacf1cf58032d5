//! Output types of the daily-views pipeline.
//!
//! These are what the CLI prints and what an HTTP handler would serialize
//! for the dashboard; field names follow the dashboard's camelCase JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use view_sources::models::{day_range::DateRange, writer::WriterIdentity};

/// Which source a day's figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewSource {
    /// Authoritative warehouse daily totals.
    BatchSource,
    /// Derived from real-time cumulative counters.
    RealtimeFallback,
}

impl ViewSource {
    /// Short name used in logs and error messages.
    pub const fn as_str(self) -> &'static str {
        match self {
            ViewSource::BatchSource => "batch",
            ViewSource::RealtimeFallback => "realtime",
        }
    }
}

impl std::fmt::Display for ViewSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One day of the merged series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyViewPoint {
    /// Calendar day in the canonical zone.
    pub date: NaiveDate,
    /// Views attributed to that day. Never negative by construction.
    pub views: u64,
    /// Where the figure came from.
    pub source: ViewSource,
}

/// A negative day-over-day delta that was clamped to zero.
///
/// Counter resets and data migrations show up this way. They are reported,
/// never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAnomaly {
    /// Source whose counters went backwards.
    pub source: ViewSource,
    /// Entity (video id, or the writer for writer-level series).
    pub entity_id: String,
    /// Day whose delta was clamped.
    pub date: NaiveDate,
    /// Running total before the day.
    pub previous: u64,
    /// Running total at the end of the day.
    pub current: u64,
}

/// Per-source day and view counts of a merged series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    /// Days taken from the batch source.
    pub batch_days: usize,
    /// Views contributed by those days.
    pub batch_views: u64,
    /// Days taken from the real-time source.
    pub realtime_days: usize,
    /// Views contributed by those days.
    pub realtime_views: u64,
}

impl SourceBreakdown {
    /// Tallies a series.
    pub fn from_series(series: &[DailyViewPoint]) -> Self {
        let mut out = Self::default();
        for p in series {
            match p.source {
                ViewSource::BatchSource => {
                    out.batch_days += 1;
                    out.batch_views = out.batch_views.saturating_add(p.views);
                }
                ViewSource::RealtimeFallback => {
                    out.realtime_days += 1;
                    out.realtime_views = out.realtime_views.saturating_add(p.views);
                }
            }
        }
        out
    }
}

/// Result of a daily-views query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledViews {
    /// The writer the series belongs to.
    pub writer: WriterIdentity,
    /// Requested inclusive range.
    pub range: DateRange,
    /// One point per day, ascending by date.
    pub series: Vec<DailyViewPoint>,
    /// Sum of `series[*].views`, saturating at `u64::MAX`.
    pub total_views: u64,
    /// Per-source tallies.
    pub source_breakdown: SourceBreakdown,
    /// Set when any source was unavailable or any day could not be derived.
    pub partial: bool,
    /// Sources that failed or timed out.
    pub unavailable_sources: Vec<ViewSource>,
    /// Days no available source could cover (only when the gap-filling
    /// source was unavailable).
    pub missing_days: Vec<NaiveDate>,
    /// Clamped negative deltas observed while building the series.
    pub anomalies: Vec<DataAnomaly>,
}

impl ReconciledViews {
    /// Builds the result, deriving the total and breakdown from `series`.
    pub fn new(writer: WriterIdentity, range: DateRange, series: Vec<DailyViewPoint>) -> Self {
        let total_views = series
            .iter()
            .fold(0u64, |acc, p| acc.saturating_add(p.views));
        let source_breakdown = SourceBreakdown::from_series(&series);
        Self {
            writer,
            range,
            series,
            total_views,
            source_breakdown,
            partial: false,
            unavailable_sources: Vec::new(),
            missing_days: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// True when no view was attributed to any day.
    pub fn is_empty(&self) -> bool {
        self.total_views == 0
    }
}
