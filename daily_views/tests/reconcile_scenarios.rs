use std::sync::{Arc, atomic::Ordering};

use daily_views::{ReconcileError, ViewSource};
use view_sources::models::views::BatchSemantics;

mod common;
use common::{
    Behavior, FakeBatch, FakeRealtime, day, range, realtime_only, reconciler, samples, writer,
};

const RT_ENDS: &[(i64, u64)] = &[
    (0, 1_000),
    (1, 1_050),
    (2, 1_100),
    (3, 1_160),
    (4, 1_200),
    (5, 1_230),
    (6, 1_300),
    (7, 1_345),
];

fn views(out: &daily_views::ReconciledViews) -> Vec<(u64, ViewSource)> {
    out.series.iter().map(|p| (p.views, p.source)).collect()
}

#[tokio::test]
async fn batch_days_then_realtime_tail() {
    let batch = Arc::new(FakeBatch::daily(&[(1, 100), (2, 110), (3, 120), (4, 130), (5, 140)]));
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", RT_ENDS)));

    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 7)).await.unwrap();

    use ViewSource::*;
    assert_eq!(
        views(&out),
        vec![
            (100, BatchSource),
            (110, BatchSource),
            (120, BatchSource),
            (130, BatchSource),
            (140, BatchSource),
            (70, RealtimeFallback),
            (45, RealtimeFallback),
        ]
    );
    assert_eq!(
        out.series.iter().map(|p| p.date).collect::<Vec<_>>(),
        range(1, 7).days().collect::<Vec<_>>()
    );
    assert_eq!(out.total_views, 715);
    assert_eq!(out.source_breakdown.batch_days, 5);
    assert_eq!(out.source_breakdown.realtime_views, 115);
    assert!(!out.partial);
    assert!(out.missing_days.is_empty());
}

#[tokio::test]
async fn both_sources_empty_is_a_zero_series() {
    let batch = Arc::new(FakeBatch::daily(&[]));
    let rt = Arc::new(FakeRealtime::new(vec![]));

    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 7)).await.unwrap();

    assert_eq!(out.series.len(), 7);
    assert!(out.series.iter().all(|p| p.views == 0));
    assert_eq!(out.total_views, 0);
    assert!(out.is_empty());
    assert!(!out.partial);
}

#[tokio::test]
async fn failed_batch_equals_realtime_only_reconstruction() {
    let batch = Arc::new(FakeBatch::failing(Behavior::Fail));
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", RT_ENDS)));

    let merged = reconciler(batch, rt.clone(), 7)
        .reconcile(&writer(), range(1, 7))
        .await
        .unwrap();
    let alone = realtime_only(rt, 7).reconcile(&writer(), range(1, 7)).await.unwrap();

    assert_eq!(merged.series, alone.series);
    assert!(merged.series.iter().all(|p| p.source == ViewSource::RealtimeFallback));
    assert_eq!(merged.total_views, 345);
    assert!(merged.partial);
    assert_eq!(merged.unavailable_sources, vec![ViewSource::BatchSource]);
}

#[tokio::test]
async fn hanging_batch_times_out_into_a_partial_result() {
    let batch = Arc::new(FakeBatch::failing(Behavior::Hang));
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", RT_ENDS)));

    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 7)).await.unwrap();

    assert!(out.partial);
    assert_eq!(out.unavailable_sources, vec![ViewSource::BatchSource]);
    assert_eq!(out.series.len(), 7);
}

#[tokio::test]
async fn failed_realtime_leaves_uncovered_days_missing() {
    let batch = Arc::new(FakeBatch::daily(&[(1, 100), (2, 110), (3, 120), (4, 130), (5, 140)]));
    let rt = Arc::new(FakeRealtime::failing(Behavior::Fail));

    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 7)).await.unwrap();

    assert_eq!(out.series.len(), 5);
    assert!(out.series.iter().all(|p| p.source == ViewSource::BatchSource));
    assert_eq!(out.missing_days, vec![day(6), day(7)]);
    assert_eq!(out.unavailable_sources, vec![ViewSource::RealtimeFallback]);
    assert!(out.partial);
    assert_eq!(out.total_views, 600);
}

#[tokio::test]
async fn both_unavailable_is_an_error_not_mock_data() {
    let batch = Arc::new(FakeBatch::failing(Behavior::Fail));
    let rt = Arc::new(FakeRealtime::failing(Behavior::Fail));

    let err = reconciler(batch.clone(), rt.clone(), 7)
        .reconcile(&writer(), range(1, 7))
        .await
        .unwrap_err();

    match err {
        ReconcileError::UpstreamUnavailable { sources, detail } => {
            assert_eq!(sources, vec![ViewSource::BatchSource, ViewSource::RealtimeFallback]);
            assert_eq!(detail.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(batch.calls.load(Ordering::SeqCst), 1);
    assert_eq!(rt.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn first_day_of_a_series_contributes_zero() {
    // A video already at 50k views when the window opens must not put 50k
    // on the first day.
    let rt = Arc::new(FakeRealtime::new(samples(
        "vid-old",
        &[(1, 50_000), (2, 50_020), (3, 50_020)],
    )));

    let out = realtime_only(rt, 0).reconcile(&writer(), range(1, 3)).await.unwrap();

    assert_eq!(out.series.iter().map(|p| p.views).collect::<Vec<_>>(), vec![0, 20, 0]);
    assert_eq!(out.total_views, 20);
}

#[tokio::test]
async fn new_entity_mid_range_starts_at_zero() {
    let mut all = samples("vid-a", &[(1, 10), (2, 20), (3, 30)]);
    all.extend(samples("vid-new", &[(2, 5_000), (3, 5_100)]));
    let rt = Arc::new(FakeRealtime::new(all));

    let out = realtime_only(rt, 0).reconcile(&writer(), range(1, 3)).await.unwrap();

    assert_eq!(out.series.iter().map(|p| p.views).collect::<Vec<_>>(), vec![0, 10, 110]);
}

#[tokio::test]
async fn counter_reset_is_clamped_and_reported() {
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", &[(1, 500), (2, 20), (3, 35)])));

    let out = realtime_only(rt, 0).reconcile(&writer(), range(1, 3)).await.unwrap();

    assert_eq!(out.series.iter().map(|p| p.views).collect::<Vec<_>>(), vec![0, 0, 15]);
    assert_eq!(out.anomalies.len(), 1);
    assert_eq!(out.anomalies[0].date, day(2));
    assert_eq!(out.anomalies[0].entity_id, "vid-a");
    assert_eq!((out.anomalies[0].previous, out.anomalies[0].current), (500, 20));
}

#[tokio::test]
async fn handover_below_prior_realtime_total_uses_realtime_delta() {
    let batch = Arc::new(FakeBatch::cumulative(&[(4, 900), (5, 1_000), (6, 1_100), (7, 1_150)]));
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", RT_ENDS)));

    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 7)).await.unwrap();

    use ViewSource::*;
    assert_eq!(
        views(&out),
        vec![
            (50, RealtimeFallback),
            (50, RealtimeFallback),
            (60, RealtimeFallback),
            (40, RealtimeFallback),
            (100, BatchSource),
            (100, BatchSource),
            (50, BatchSource),
        ]
    );
    assert_eq!(out.total_views, 450);
    assert!(out.anomalies.is_empty());
}

#[tokio::test]
async fn handover_above_prior_realtime_total_keeps_batch() {
    let batch = Arc::new(FakeBatch::cumulative(&[(4, 1_190), (5, 1_290), (6, 1_390), (7, 1_440)]));
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", RT_ENDS)));

    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 7)).await.unwrap();

    assert_eq!(out.series[3].views, 30);
    assert_eq!(out.series[3].source, ViewSource::BatchSource);
    assert_eq!(out.total_views, 50 + 50 + 60 + 30 + 100 + 100 + 50);
}

#[tokio::test]
async fn handover_on_the_first_requested_day_sees_the_day_before() {
    let batch = Arc::new(FakeBatch::with(
        BatchSemantics::Cumulative,
        &[(1, 1_020), (2, 1_080)],
        Behavior::Answer,
    ));
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", RT_ENDS)));

    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 2)).await.unwrap();

    // Day 1: batch 1020 minus real-time 1000 at the end of August 31st.
    assert_eq!(out.series[0].views, 20);
    assert_eq!(out.series[0].source, ViewSource::BatchSource);
    assert_eq!(out.series[1].views, 60);
}

#[tokio::test]
async fn lookback_past_the_calendar_fails_only_the_realtime_source() {
    let batch = Arc::new(FakeBatch::daily(&[(1, 100), (2, 110)]));
    let rt = Arc::new(FakeRealtime::new(samples("vid-a", RT_ENDS)));

    let out = reconciler(batch, rt.clone(), u32::MAX)
        .reconcile(&writer(), range(1, 2))
        .await
        .unwrap();
    assert_eq!(views(&out), vec![(100, ViewSource::BatchSource), (110, ViewSource::BatchSource)]);
    assert!(out.partial);
    assert_eq!(out.unavailable_sources, vec![ViewSource::RealtimeFallback]);

    let err = realtime_only(rt.clone(), u32::MAX)
        .reconcile(&writer(), range(1, 2))
        .await
        .unwrap_err();
    match err {
        ReconcileError::UpstreamUnavailable { detail, .. } => {
            assert!(detail[0].contains("leaves the calendar"), "{detail:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(rt.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn counters_near_u64_max_saturate_instead_of_panicking() {
    let half = u64::MAX / 2;
    let mut all = samples("vid-a", &[(0, half + 10), (1, half + 20)]);
    all.extend(samples("vid-b", &[(0, half + 10), (1, half + 20)]));
    let rt = Arc::new(FakeRealtime::new(all));

    let out = realtime_only(rt, 7).reconcile(&writer(), range(1, 1)).await.unwrap();
    assert_eq!(out.series[0].views, 20);

    let batch = Arc::new(FakeBatch::daily(&[(1, u64::MAX), (1, 5), (2, 7)]));
    let rt = Arc::new(FakeRealtime::new(vec![]));
    let out = reconciler(batch, rt, 7).reconcile(&writer(), range(1, 2)).await.unwrap();
    assert_eq!(out.series[0].views, u64::MAX);
    assert_eq!(out.total_views, u64::MAX);
    assert_eq!(out.source_breakdown.batch_views, u64::MAX);
}
