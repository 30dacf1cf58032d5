//! Cumulative counters -> daily deltas.
//!
//! Both the real-time store (per-video running totals sampled hourly) and
//! some batch tables (per-writer running totals snapshotted daily) report
//! counters that only ever grow. Turning them into per-day figures goes
//! through two steps:
//!
//! 1. [`day_ends_from_samples`]: keep the last value each entity reported on
//!    each canonical day.
//! 2. [`deltas_from_day_ends`]: per entity, `delta(d) = end(d) - end(prev)`
//!    where `prev` is the entity's previous reporting day, then sum across
//!    entities.
//!
//! Rules:
//! - An entity's first reporting day contributes `0`. There is no baseline to
//!   subtract from, and using the raw running total would attribute the whole
//!   lifetime of the entity to that day.
//! - A negative delta (counter reset, data migration) contributes `0` and is
//!   recorded as a [`DataAnomaly`]. The new, lower value becomes the baseline.
//! - Sums across entities saturate at `u64::MAX`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::warn;
use view_sources::models::{day_range::DateRange, views::CumulativeSample};

use crate::{
    models::{DataAnomaly, ViewSource},
    series::{DayFigure, SourceSeries},
    tz::local_day,
};

/// End-of-day counter value per entity per canonical day.
pub type EntityDayEnds = BTreeMap<String, BTreeMap<NaiveDate, u64>>;

/// Groups samples by entity and canonical day, keeping the latest sample of
/// each day. Equal timestamps keep the larger value.
pub fn day_ends_from_samples(samples: &[CumulativeSample], tz: Tz) -> EntityDayEnds {
    let mut latest: HashMap<(&str, NaiveDate), (DateTime<Utc>, u64)> = HashMap::new();
    for s in samples {
        let key = (s.entity_id.as_str(), local_day(s.timestamp, tz));
        let entry = latest
            .entry(key)
            .or_insert((s.timestamp, s.cumulative_views));
        if (s.timestamp, s.cumulative_views) > *entry {
            *entry = (s.timestamp, s.cumulative_views);
        }
    }

    let mut out = EntityDayEnds::new();
    for ((entity, day), (_, value)) in latest {
        out.entry(entity.to_string()).or_default().insert(day, value);
    }
    out
}

/// Turns per-entity day ends into a per-day series.
///
/// Only days inside `keep` are emitted; days before it serve as baselines.
/// A day is present in the output when at least one entity reported on it.
/// `end_cumulative` of a day is the sum over all entities of their latest
/// known value at or before that day.
pub fn deltas_from_day_ends(
    source: ViewSource,
    ends: &EntityDayEnds,
    keep: &DateRange,
) -> SourceSeries {
    let mut days: BTreeMap<NaiveDate, DayFigure> = BTreeMap::new();
    let mut anomalies = Vec::new();

    for (entity, series) in ends {
        let mut prev: Option<u64> = None;
        for (&day, &value) in series {
            let delta = match prev {
                None => 0,
                Some(p) if value >= p => value - p,
                Some(p) => {
                    if keep.contains(day) {
                        warn!(
                            source = %source,
                            entity = %entity,
                            %day,
                            previous = p,
                            current = value,
                            "cumulative counter went backwards; clamping delta to zero"
                        );
                        anomalies.push(DataAnomaly {
                            source,
                            entity_id: entity.clone(),
                            date: day,
                            previous: p,
                            current: value,
                        });
                    }
                    0
                }
            };
            prev = Some(value);

            if keep.contains(day) {
                let figure = days.entry(day).or_insert(DayFigure::new(0, Some(0)));
                figure.views = figure.views.saturating_add(delta);
            }
        }
    }

    // Running sum of every entity's latest value, walked in day order. Kept
    // wide so removing an entity's old value stays exact past `u64::MAX`.
    let all_days: BTreeSet<NaiveDate> = ends.values().flat_map(|s| s.keys().copied()).collect();
    let mut latest: HashMap<&str, u64> = HashMap::new();
    let mut running: u128 = 0;
    for day in all_days {
        for (entity, series) in ends {
            if let Some(&value) = series.get(&day) {
                let old = latest.insert(entity.as_str(), value).unwrap_or(0);
                running = running - u128::from(old) + u128::from(value);
            }
        }
        if let Some(fig) = days.get_mut(&day) {
            fig.end_cumulative = Some(u64::try_from(running).unwrap_or(u64::MAX));
        }
    }

    anomalies.sort_by(|a, b| (a.date, &a.entity_id).cmp(&(b.date, &b.entity_id)));
    SourceSeries { days, anomalies }
}
