//! Raw rows as the upstream stores return them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// What a batch row's `views` value means.
///
/// Some historical tables hold daily figures, others hold running totals
/// snapshotted once a day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSemantics {
    #[default]
    Daily,
    Cumulative,
}

/// One aggregated row from the batch store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchDailyRow {
    /// Calendar day in the canonical zone.
    pub date: NaiveDate,
    /// Daily or cumulative total, per [`BatchSemantics`].
    pub views: u64,
}

/// One cumulative counter sample from the real-time store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeSample {
    /// The counted entity (a video id).
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    /// Running total of views as of `timestamp`.
    pub cumulative_views: u64,
}
