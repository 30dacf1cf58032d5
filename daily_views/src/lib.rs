//! Daily-views reconciliation for the writer analytics dashboard.
//!
//! A writer's views per calendar day come from two upstreams: an
//! authoritative batch warehouse and a real-time store of cumulative
//! per-video counters. This crate merges them into one gap-free,
//! non-negative, source-tagged series.
//!
//! Layout:
//! - [`tz`]: the single time zone boundary
//! - [`coverage`], [`cumulative`]: day bitmaps and counter-to-delta math
//! - [`series`]: upstream stores wrapped as ranked series providers
//! - [`reconcile`]: fan-out, timeouts, day assignment and the handover rule
//! - [`identity`], [`db`], [`schema`]: the SQLite writer directory
//! - [`config`], [`service`]: TOML configuration and the public operation

#![warn(missing_docs)]

pub mod config;
pub mod coverage;
pub mod cumulative;
pub mod db;
pub mod error;
pub mod identity;
pub mod models;
pub mod reconcile;
#[allow(missing_docs)]
pub mod schema;
pub mod series;
pub mod service;
pub mod tz;

pub use error::ReconcileError;
pub use models::{DailyViewPoint, ReconciledViews, ViewSource};
pub use service::DailyViewsService;
