//! Multi-source daily-views reconciliation.
//!
//! [`Reconciler`] fans out to every ranked [`DailySeriesProvider`]
//! concurrently, each call under its own timeout, then hands the
//! successful series to [`merge::merge`].
//!
//! Failure policy:
//! - some providers fail: the rest are merged and the result is `partial`;
//! - every provider fails: [`ReconcileError::UpstreamUnavailable`].
//!
//! Nothing is ever synthesized to paper over a failed source.

pub mod merge;

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tracing::{debug, info, warn};
use view_sources::{
    models::{day_range::DateRange, writer::WriterIdentity},
    providers::{ProviderError, TimeoutSnafu},
};

use crate::{error::ReconcileError, models::ReconciledViews, series::DailySeriesProvider};

use merge::Fetched;

/// Ranked providers plus the per-call upstream budget.
pub struct Reconciler {
    providers: Vec<Arc<dyn DailySeriesProvider>>,
    timeout: Duration,
}

impl Reconciler {
    /// `providers` in rank order, most authoritative first.
    pub fn new(providers: Vec<Arc<dyn DailySeriesProvider>>, timeout: Duration) -> Self {
        Self { providers, timeout }
    }

    /// Produces one point per day of `range` for `writer`.
    pub async fn reconcile(
        &self,
        writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<ReconciledViews, ReconcileError> {
        // One extra day so a handover on `range.start()` can see its previous day.
        let fetch_range = range.extend_back(1)?;

        let results = join_all(
            self.providers
                .iter()
                .map(|p| fetch_with_timeout(p.as_ref(), writer, fetch_range, self.timeout)),
        )
        .await;

        let mut fetched = Vec::with_capacity(results.len());
        let mut unavailable = Vec::new();
        let mut detail = Vec::new();
        for (provider, result) in self.providers.iter().zip(results) {
            match result {
                Ok(series) => {
                    debug!(
                        source = %provider.source(),
                        days = series.days.len(),
                        "source fetched"
                    );
                    fetched.push(Fetched {
                        source: provider.source(),
                        fills_gaps: provider.fills_gaps(),
                        series,
                    });
                }
                Err(e) => {
                    warn!(
                        source = %provider.source(),
                        writer = %writer,
                        error = %e,
                        "source unavailable"
                    );
                    unavailable.push(provider.source());
                    detail.push(e.to_string());
                }
            }
        }

        if fetched.is_empty() {
            return Err(ReconcileError::UpstreamUnavailable {
                sources: unavailable,
                detail,
            });
        }

        let out = merge::merge(writer, range, &fetched, unavailable);
        info!(
            writer = %writer,
            start = %range.start(),
            end = %range.end(),
            total = out.total_views,
            batch_days = out.source_breakdown.batch_days,
            realtime_days = out.source_breakdown.realtime_days,
            partial = out.partial,
            anomalies = out.anomalies.len(),
            "daily views reconciled"
        );
        Ok(out)
    }
}

async fn fetch_with_timeout(
    provider: &dyn DailySeriesProvider,
    writer: &WriterIdentity,
    range: DateRange,
    timeout: Duration,
) -> Result<crate::series::SourceSeries, ProviderError> {
    match tokio::time::timeout(timeout, provider.daily_series(writer, range)).await {
        Ok(result) => result,
        Err(_) => TimeoutSnafu {
            elapsed_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
        .fail(),
    }
}
