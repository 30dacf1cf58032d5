//! Upstream view-count stores for the daily-views pipeline.
//!
//! - [`models`]: writer identity, date ranges and the raw row/sample shapes.
//! - [`providers`]: the [`BatchStore`](providers::BatchStore) and
//!   [`RealtimeStore`](providers::RealtimeStore) traits plus REST clients for
//!   BigQuery and InfluxDB.

pub mod models;
pub mod providers;
