//! Real-time counters as a series provider.

use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use tracing::debug;
use view_sources::{
    models::{day_range::DateRange, writer::WriterIdentity},
    providers::{InternalSnafu, ProviderError, RealtimeStore, ValidationSnafu},
};

use super::{DailySeriesProvider, SourceSeries};
use crate::{
    cumulative::{day_ends_from_samples, deltas_from_day_ends},
    models::ViewSource,
    tz::day_bounds_utc,
};

/// Wraps a [`RealtimeStore`].
///
/// Samples are fetched from `lookback_days` before the requested range so an
/// entity's first requested day has a prior snapshot when one exists.
pub struct RealtimeSeriesProvider {
    store: Arc<dyn RealtimeStore>,
    tz: Tz,
    lookback_days: u32,
}

impl RealtimeSeriesProvider {
    /// Days are canonical days in `tz`.
    pub fn new(store: Arc<dyn RealtimeStore>, tz: Tz, lookback_days: u32) -> Self {
        Self {
            store,
            tz,
            lookback_days,
        }
    }
}

#[async_trait]
impl DailySeriesProvider for RealtimeSeriesProvider {
    fn source(&self) -> ViewSource {
        ViewSource::RealtimeFallback
    }

    fn fills_gaps(&self) -> bool {
        true
    }

    async fn daily_series(
        &self,
        writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<SourceSeries, ProviderError> {
        let lookback = range.extend_back(self.lookback_days).map_err(|e| {
            ValidationSnafu {
                message: e.to_string(),
            }
            .build()
        })?;
        let (from, to) = day_bounds_utc(&lookback, self.tz).map_err(|e| {
            InternalSnafu {
                message: format!("{e:#}"),
            }
            .build()
        })?;
        let samples = self.store.cumulative_samples(writer, from, to).await?;
        debug!(
            writer = %writer,
            samples = samples.len(),
            %from,
            %to,
            "real-time samples fetched"
        );

        let ends = day_ends_from_samples(&samples, self.tz);
        Ok(deltas_from_day_ends(ViewSource::RealtimeFallback, &ends, &range))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use view_sources::models::views::CumulativeSample;

    use super::*;
    use crate::series::DayFigure;

    struct Samples(Vec<CumulativeSample>);

    #[async_trait]
    impl RealtimeStore for Samples {
        async fn cumulative_samples(
            &self,
            _writer: &WriterIdentity,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<CumulativeSample>, ProviderError> {
            Ok(self
                .0
                .iter()
                .filter(|s| from <= s.timestamp && s.timestamp < to)
                .cloned()
                .collect())
        }
    }

    fn s(day: u32, hour: u32, views: u64) -> CumulativeSample {
        CumulativeSample {
            entity_id: "vid-1".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 8, day, hour, 0, 0).unwrap(),
            cumulative_views: views,
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, day).unwrap()
    }

    #[tokio::test]
    async fn lookback_supplies_the_first_day_baseline() {
        let store = Arc::new(Samples(vec![s(1, 20, 900), s(5, 10, 950), s(6, 10, 990)]));
        let range = DateRange::new(d(5), d(6)).unwrap();

        let with = RealtimeSeriesProvider::new(store.clone(), chrono_tz::UTC, 7);
        let out = with.daily_series(&WriterIdentity::new(3, "Lin"), range).await.unwrap();
        assert_eq!(out.get(d(5)), Some(&DayFigure::new(50, Some(950))));
        assert_eq!(out.get(d(6)), Some(&DayFigure::new(40, Some(990))));

        let without = RealtimeSeriesProvider::new(store, chrono_tz::UTC, 0);
        let out = without.daily_series(&WriterIdentity::new(3, "Lin"), range).await.unwrap();
        assert_eq!(out.get(d(5)).map(|f| f.views), Some(0));
        assert!(without.fills_gaps());
    }
}
