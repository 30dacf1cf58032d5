//! Batch warehouse as a series provider.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use view_sources::{
    models::{
        day_range::DateRange,
        views::{BatchDailyRow, BatchSemantics},
        writer::WriterIdentity,
    },
    providers::{BatchStore, ProviderError, ValidationSnafu},
};

use super::{DailySeriesProvider, DayFigure, SourceSeries};
use crate::{
    cumulative::{EntityDayEnds, deltas_from_day_ends},
    models::ViewSource,
};

/// Wraps a [`BatchStore`].
///
/// Daily tables are used as-is. Running-total tables are differenced, with
/// one extra day fetched so the first requested day has a baseline.
pub struct BatchSeriesProvider {
    store: Arc<dyn BatchStore>,
}

impl BatchSeriesProvider {
    /// Wraps `store`.
    pub fn new(store: Arc<dyn BatchStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DailySeriesProvider for BatchSeriesProvider {
    fn source(&self) -> ViewSource {
        ViewSource::BatchSource
    }

    async fn daily_series(
        &self,
        writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<SourceSeries, ProviderError> {
        let semantics = self.store.semantics();
        let fetch = match semantics {
            BatchSemantics::Daily => range,
            BatchSemantics::Cumulative => range.extend_back(1).map_err(|e| {
                ValidationSnafu {
                    message: e.to_string(),
                }
                .build()
            })?,
        };
        let rows = self.store.daily_rows(writer, fetch).await?;
        debug!(writer = %writer, rows = rows.len(), ?semantics, "batch rows fetched");

        Ok(match semantics {
            BatchSemantics::Daily => daily_series(&rows, &range),
            BatchSemantics::Cumulative => cumulative_series(writer, &rows, &range),
        })
    }
}

fn daily_series(rows: &[BatchDailyRow], range: &DateRange) -> SourceSeries {
    let mut out = SourceSeries::default();
    for row in rows.iter().filter(|r| range.contains(r.date)) {
        // Duplicate rows for a day are summed.
        let figure = out
            .days
            .entry(row.date)
            .or_insert(DayFigure::new(0, None));
        figure.views = figure.views.saturating_add(row.views);
    }
    out
}

fn cumulative_series(
    writer: &WriterIdentity,
    rows: &[BatchDailyRow],
    range: &DateRange,
) -> SourceSeries {
    let mut ends = EntityDayEnds::new();
    let per_day = ends.entry(writer.writer_name.clone()).or_default();
    for row in rows {
        let v = per_day.entry(row.date).or_insert(row.views);
        *v = (*v).max(row.views);
    }
    deltas_from_day_ends(ViewSource::BatchSource, &ends, range)
}
