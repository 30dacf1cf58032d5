#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use daily_views::{
    db::{connection, migrate},
    identity::{IdentityError, IdentityResolver},
    reconcile::Reconciler,
    series::{DailySeriesProvider, batch::BatchSeriesProvider, realtime::RealtimeSeriesProvider},
};
use diesel::SqliteConnection;
use tempfile::TempDir;
use view_sources::{
    models::{
        day_range::DateRange,
        views::{BatchDailyRow, BatchSemantics, CumulativeSample},
        writer::{SessionId, WriterIdentity},
    },
    providers::{ApiSnafu, BatchStore, ProviderError, RealtimeStore},
};

/// Upstream timeout used by every test reconciler.
pub const TIMEOUT: Duration = Duration::from_millis(200);

/// How a fake store answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    Answer,
    Fail,
    Hang,
}

async fn behave(b: Behavior) -> Result<(), ProviderError> {
    match b {
        Behavior::Answer => Ok(()),
        Behavior::Fail => ApiSnafu {
            status: 503u16,
            message: "upstream down",
        }
        .fail(),
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
}

/// Day `n` of September 2024; `day(0)` is August 31st.
pub fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap() + chrono::Duration::days(n - 1)
}

pub fn range(first: i64, last: i64) -> DateRange {
    DateRange::new(day(first), day(last)).unwrap()
}

pub fn writer() -> WriterIdentity {
    WriterIdentity::new(1, "Ada")
}

pub struct FakeBatch {
    pub semantics: BatchSemantics,
    pub rows: Vec<BatchDailyRow>,
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl FakeBatch {
    pub fn daily(rows: &[(i64, u64)]) -> Self {
        Self::with(BatchSemantics::Daily, rows, Behavior::Answer)
    }

    pub fn cumulative(rows: &[(i64, u64)]) -> Self {
        Self::with(BatchSemantics::Cumulative, rows, Behavior::Answer)
    }

    pub fn with(semantics: BatchSemantics, rows: &[(i64, u64)], behavior: Behavior) -> Self {
        Self {
            semantics,
            rows: rows
                .iter()
                .map(|&(n, views)| BatchDailyRow { date: day(n), views })
                .collect(),
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(behavior: Behavior) -> Self {
        Self::with(BatchSemantics::Daily, &[], behavior)
    }
}

#[async_trait]
impl BatchStore for FakeBatch {
    fn semantics(&self) -> BatchSemantics {
        self.semantics
    }

    async fn daily_rows(
        &self,
        _writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<Vec<BatchDailyRow>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        behave(self.behavior).await?;
        Ok(self.rows.iter().filter(|r| range.contains(r.date)).cloned().collect())
    }
}

pub struct FakeRealtime {
    pub samples: Vec<CumulativeSample>,
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl FakeRealtime {
    pub fn new(samples: Vec<CumulativeSample>) -> Self {
        Self {
            samples,
            behavior: Behavior::Answer,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(behavior: Behavior) -> Self {
        Self {
            samples: vec![],
            behavior,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RealtimeStore for FakeRealtime {
    async fn cumulative_samples(
        &self,
        _writer: &WriterIdentity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CumulativeSample>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        behave(self.behavior).await?;
        Ok(self
            .samples
            .iter()
            .filter(|s| from <= s.timestamp && s.timestamp < to)
            .cloned()
            .collect())
    }
}

/// Two samples per day for `entity` (08:00 and 23:00 UTC); the later one
/// carries the day's end value.
pub fn samples(entity: &str, day_ends: &[(i64, u64)]) -> Vec<CumulativeSample> {
    let mut out = Vec::new();
    for &(n, end) in day_ends {
        let date = day(n);
        for (hour, value) in [(8, end.saturating_sub(1)), (23, end)] {
            out.push(CumulativeSample {
                entity_id: entity.to_string(),
                timestamp: Utc
                    .from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap()),
                cumulative_views: value,
            });
        }
    }
    out
}

/// Batch first, real-time second, UTC days.
pub fn reconciler(
    batch: Arc<FakeBatch>,
    realtime: Arc<FakeRealtime>,
    lookback_days: u32,
) -> Reconciler {
    let providers: Vec<Arc<dyn DailySeriesProvider>> = vec![
        Arc::new(BatchSeriesProvider::new(batch)),
        Arc::new(RealtimeSeriesProvider::new(realtime, chrono_tz::UTC, lookback_days)),
    ];
    Reconciler::new(providers, TIMEOUT)
}

pub fn realtime_only(realtime: Arc<FakeRealtime>, lookback_days: u32) -> Reconciler {
    let providers: Vec<Arc<dyn DailySeriesProvider>> = vec![Arc::new(RealtimeSeriesProvider::new(
        realtime,
        chrono_tz::UTC,
        lookback_days,
    ))];
    Reconciler::new(providers, TIMEOUT)
}

/// In-memory identity map.
#[derive(Default)]
pub struct MapResolver {
    pub writers: HashMap<i64, WriterIdentity>,
    pub sessions: HashMap<String, i64>,
}

impl MapResolver {
    pub fn with_writer(mut self, w: WriterIdentity, session: Option<&str>) -> Self {
        if let Some(s) = session {
            self.sessions.insert(s.to_string(), w.writer_id);
        }
        self.writers.insert(w.writer_id, w);
        self
    }
}

#[async_trait]
impl IdentityResolver for MapResolver {
    async fn resolve_session(&self, session: &SessionId) -> Result<WriterIdentity, IdentityError> {
        self.sessions
            .get(session.as_str())
            .and_then(|id| self.writers.get(id))
            .cloned()
            .ok_or_else(|| IdentityError::NotFound("session".into()))
    }

    async fn resolve_writer(&self, writer_id: i64) -> Result<WriterIdentity, IdentityError> {
        self.writers
            .get(&writer_id)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(format!("writer {writer_id}")))
    }
}

pub struct TestDb {
    _dir: TempDir,    // keep alive for the life of the test
    pub path: String, // <tmpdir>/writers.db
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("writers.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}
