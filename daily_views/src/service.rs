//! The daily-views operation as a library call.
//!
//! [`DailyViewsService`] is what an HTTP handler (or the CLI) holds. Each call
//! validates the range, resolves the writer, then reconciles; the first two
//! steps fail fast before any upstream is contacted.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use chrono::NaiveDate;
use tracing::debug;
use view_sources::{
    models::{
        day_range::DateRange,
        writer::{SessionId, WriterIdentity},
    },
    providers::{BatchStore, RealtimeStore, bigquery::BigQueryStore, influxdb::InfluxStore},
};

use crate::{
    config::Config,
    error::ReconcileError,
    identity::{IdentityResolver, resolver::DirectoryResolver},
    models::ReconciledViews,
    reconcile::Reconciler,
    series::{DailySeriesProvider, batch::BatchSeriesProvider, realtime::RealtimeSeriesProvider},
    tz::parse_tz,
};

/// Resolves writers and reconciles their daily views.
pub struct DailyViewsService {
    resolver: Arc<dyn IdentityResolver>,
    reconciler: Reconciler,
    max_range_days: u32,
}

impl DailyViewsService {
    /// Assembles a service from already built parts.
    pub fn new(
        resolver: Arc<dyn IdentityResolver>,
        reconciler: Reconciler,
        max_range_days: u32,
    ) -> Self {
        Self {
            resolver,
            reconciler,
            max_range_days,
        }
    }

    /// Standard wiring: batch first, real-time second.
    pub fn with_stores(
        resolver: Arc<dyn IdentityResolver>,
        batch: Arc<dyn BatchStore>,
        realtime: Arc<dyn RealtimeStore>,
        cfg: &Config,
    ) -> anyhow::Result<Self> {
        let tz = parse_tz(&cfg.reconcile.canonical_timezone)?;
        let providers: Vec<Arc<dyn DailySeriesProvider>> = vec![
            Arc::new(BatchSeriesProvider::new(batch)),
            Arc::new(RealtimeSeriesProvider::new(
                realtime,
                tz,
                cfg.reconcile.realtime_lookback_days,
            )),
        ];
        let timeout = Duration::from_millis(cfg.reconcile.upstream_timeout_ms);
        let reconciler = Reconciler::new(providers, timeout);
        Ok(Self::new(resolver, reconciler, cfg.reconcile.max_range_days))
    }

    /// Builds the REST clients and the writer directory from `cfg`.
    ///
    /// Reads `BIGQUERY_ACCESS_TOKEN` and `INFLUXDB_TOKEN` from the environment.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let batch = BigQueryStore::new(cfg.batch.clone(), &cfg.reconcile.canonical_timezone)
            .context("build BigQuery client")?;
        let realtime = InfluxStore::new(cfg.realtime.clone()).context("build InfluxDB client")?;
        let resolver = DirectoryResolver::open(
            &cfg.identity.database_url,
            Duration::from_secs(cfg.identity.cache_ttl_secs),
        )?;
        Self::with_stores(Arc::new(resolver), Arc::new(batch), Arc::new(realtime), cfg)
    }

    /// Daily views of the writer with id `writer_id`, `start..=end`.
    pub async fn get_daily_views(
        &self,
        writer_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ReconciledViews, ReconcileError> {
        let range = self.validate(start, end)?;
        let writer = self.resolver.resolve_writer(writer_id).await?;
        self.run(&writer, range).await
    }

    /// Daily views of the writer owning `session`, `start..=end`.
    pub async fn get_daily_views_for_session(
        &self,
        session: &SessionId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ReconciledViews, ReconcileError> {
        let range = self.validate(start, end)?;
        let writer = self.resolver.resolve_session(session).await?;
        self.run(&writer, range).await
    }

    fn validate(&self, start: NaiveDate, end: NaiveDate) -> Result<DateRange, ReconcileError> {
        Ok(DateRange::bounded(start, end, self.max_range_days)?)
    }

    async fn run(
        &self,
        writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<ReconciledViews, ReconcileError> {
        debug!(
            writer = %writer,
            start = %range.start(),
            end = %range.end(),
            "reconciling"
        );
        self.reconciler.reconcile(writer, range).await
    }
}
