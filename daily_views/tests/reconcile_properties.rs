use std::{collections::BTreeSet, sync::Arc};

use proptest::prelude::*;
use view_sources::models::views::BatchSemantics;

mod common;
use common::{Behavior, FakeBatch, FakeRealtime, range, reconciler, samples, writer};

const DAYS: i64 = 14;

fn run(
    semantics: BatchSemantics,
    batch_rows: Vec<(i64, u64)>,
    rt_ends: Vec<(i64, u64)>,
    batch_ok: bool,
    rt_ok: bool,
) -> Result<daily_views::ReconciledViews, daily_views::ReconcileError> {
    let batch = FakeBatch::with(
        semantics,
        &batch_rows,
        if batch_ok { Behavior::Answer } else { Behavior::Fail },
    );
    let rt = if rt_ok {
        FakeRealtime::new(samples("vid-a", &rt_ends))
    } else {
        FakeRealtime::failing(Behavior::Fail)
    };
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
        .block_on(reconciler(Arc::new(batch), Arc::new(rt), 3).reconcile(&writer(), range(1, DAYS)))
}

/// A running total that mostly grows and sometimes resets.
fn running_totals() -> impl Strategy<Value = Vec<(i64, u64)>> {
    proptest::collection::vec(
        (any::<bool>(), 0u64..500, prop::bool::weighted(0.1)),
        (DAYS + 4) as usize,
    )
        .prop_map(|steps| {
            let mut total = 10_000u64;
            let mut out = Vec::new();
            for (i, (present, step, reset)) in steps.into_iter().enumerate() {
                total = if reset { step } else { total + step };
                if present {
                    out.push((i as i64 - 3, total));
                }
            }
            out
        })
}

fn batch_rows() -> impl Strategy<Value = Vec<(i64, u64)>> {
    proptest::collection::btree_map(-1i64..=DAYS, 0u64..2_000, 0..(DAYS as usize))
        .prop_map(|m| m.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn series_is_sorted_unique_in_range_and_sums_to_total(
        cumulative in any::<bool>(),
        rows in batch_rows(),
        ends in running_totals(),
        batch_ok in any::<bool>(),
        rt_ok in any::<bool>(),
    ) {
        let semantics = if cumulative { BatchSemantics::Cumulative } else { BatchSemantics::Daily };
        let res = run(semantics, rows, ends, batch_ok, rt_ok);

        if !batch_ok && !rt_ok {
            prop_assert!(res.is_err());
            return Ok(());
        }
        let out = res.unwrap();
        let r = range(1, DAYS);

        let dates: Vec<_> = out.series.iter().map(|p| p.date).collect();
        let unique: BTreeSet<_> = dates.iter().copied().collect();
        prop_assert_eq!(unique.len(), dates.len());
        prop_assert!(dates.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(dates.iter().all(|d| r.contains(*d)));

        prop_assert_eq!(out.series.iter().map(|p| p.views).sum::<u64>(), out.total_views);
        prop_assert_eq!(
            out.source_breakdown.batch_views + out.source_breakdown.realtime_views,
            out.total_views
        );

        // Every day is either in the series or reported missing, never both.
        prop_assert_eq!(dates.len() + out.missing_days.len(), r.len_days() as usize);
        prop_assert!(out.missing_days.iter().all(|d| !unique.contains(d)));

        if rt_ok {
            prop_assert!(out.missing_days.is_empty());
        }
        prop_assert_eq!(out.partial, !(batch_ok && rt_ok) || !out.missing_days.is_empty());
        prop_assert!(out.anomalies.iter().all(|a| r.contains(a.date)));
    }
}
