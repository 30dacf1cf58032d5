//! Pure day-assignment over already fetched series.
//!
//! Given the available series in rank order, every day of the range is
//! claimed by the highest-ranked series that covers it. Days nobody covers
//! are zero-filled by the first gap-filling series, or reported missing when
//! there is none. Handover days get their figure recomputed against the
//! lower-ranked series that covered the previous day.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};
use view_sources::models::{day_range::DateRange, writer::WriterIdentity};

use crate::{
    coverage::DayCoverage,
    models::{DailyViewPoint, DataAnomaly, ReconciledViews, ViewSource},
    series::SourceSeries,
};

/// One successfully fetched series with its provider's traits.
#[derive(Debug, Clone)]
pub struct Fetched {
    /// Tag of the provider.
    pub source: ViewSource,
    /// See [`DailySeriesProvider::fills_gaps`](crate::series::DailySeriesProvider::fills_gaps).
    pub fills_gaps: bool,
    /// What the provider returned.
    pub series: SourceSeries,
}

/// Outcome of the handover computation for a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handover {
    Positive(u64),
    Zero,
    Negative { previous: u64, current: u64 },
}

fn handover_value(current: &SourceSeries, day: NaiveDate, lower_prev_end: Option<u64>) -> Handover {
    let Some(fig) = current.get(day) else {
        return Handover::Zero;
    };
    match (fig.end_cumulative, lower_prev_end) {
        (Some(cur), Some(prev)) if cur >= prev => match cur - prev {
            0 => Handover::Zero,
            v => Handover::Positive(v),
        },
        (Some(cur), Some(prev)) => Handover::Negative {
            previous: prev,
            current: cur,
        },
        _ => match fig.views {
            0 => Handover::Zero,
            v => Handover::Positive(v),
        },
    }
}

/// Merges ranked series into the final result.
///
/// `fetched` must be in rank order, highest first. `unavailable` lists the
/// sources that failed; any entry marks the result partial.
pub fn merge(
    writer: &WriterIdentity,
    range: DateRange,
    fetched: &[Fetched],
    unavailable: Vec<ViewSource>,
) -> ReconciledViews {
    let mut remaining = DayCoverage::from_range(&range);
    let mut points: BTreeMap<NaiveDate, DailyViewPoint> = BTreeMap::new();
    let mut anomalies: Vec<DataAnomaly> = Vec::new();

    for (rank, current) in fetched.iter().enumerate() {
        let claimed = remaining.intersection(&current.series.coverage());
        remaining.subtract(&claimed);

        for day in claimed.days() {
            let point = claim_day(writer, day, current, &fetched[rank + 1..], &mut anomalies);
            points.insert(day, point);
        }
    }

    let mut missing_days = Vec::new();
    if !remaining.is_empty() {
        match fetched.iter().find(|f| f.fills_gaps) {
            Some(filler) => {
                for day in remaining.days() {
                    points.insert(
                        day,
                        DailyViewPoint {
                            date: day,
                            views: 0,
                            source: filler.source,
                        },
                    );
                }
            }
            None => {
                missing_days = remaining.days().collect();
                warn!(
                    writer = %writer,
                    missing = missing_days.len(),
                    "no gap-filling source available; days left uncovered"
                );
            }
        }
    }

    // Anomalies only matter for figures that made it into the series.
    for f in fetched {
        anomalies.extend(
            f.series
                .anomalies
                .iter()
                .filter(|a| points.get(&a.date).is_some_and(|p| p.source == a.source))
                .cloned(),
        );
    }
    anomalies.sort_by(|a, b| (a.date, &a.entity_id).cmp(&(b.date, &b.entity_id)));
    anomalies.dedup();

    let partial = !unavailable.is_empty() || !missing_days.is_empty();
    let mut out = ReconciledViews::new(writer.clone(), range, points.into_values().collect());
    out.partial = partial;
    out.unavailable_sources = unavailable;
    out.missing_days = missing_days;
    out.anomalies = anomalies;
    out
}

fn claim_day(
    writer: &WriterIdentity,
    day: NaiveDate,
    current: &Fetched,
    lower: &[Fetched],
    anomalies: &mut Vec<DataAnomaly>,
) -> DailyViewPoint {
    let own = current.series.get(day).map_or(0, |f| f.views);
    let plain = DailyViewPoint {
        date: day,
        views: own,
        source: current.source,
    };

    let Some(prev) = day.pred_opt() else {
        return plain;
    };
    if current.series.get(prev).is_some() {
        return plain;
    }
    let Some(below) = lower.iter().find(|f| f.series.get(prev).is_some()) else {
        return plain;
    };

    let prev_end = below.series.get(prev).and_then(|f| f.end_cumulative);
    match handover_value(&current.series, day, prev_end) {
        Handover::Positive(views) => DailyViewPoint {
            date: day,
            views,
            source: current.source,
        },
        outcome => {
            if let Some(fig) = below.series.get(day) {
                info!(
                    writer = %writer,
                    %day,
                    from = %current.source,
                    to = %below.source,
                    views = fig.views,
                    "handover day has no positive figure; using lower-ranked source"
                );
                return DailyViewPoint {
                    date: day,
                    views: fig.views,
                    source: below.source,
                };
            }
            if let Handover::Negative { previous, current: cur } = outcome {
                warn!(
                    writer = %writer,
                    %day,
                    previous,
                    current = cur,
                    "handover delta is negative and no substitute exists; clamping to zero"
                );
                anomalies.push(DataAnomaly {
                    source: current.source,
                    entity_id: writer.writer_name.clone(),
                    date: day,
                    previous,
                    current: cur,
                });
            }
            DailyViewPoint {
                date: day,
                views: 0,
                source: current.source,
            }
        }
    }
}
