//! Errors surfaced by the daily-views operation.

use thiserror::Error;
use view_sources::models::day_range::RangeError;

use crate::{identity::IdentityError, models::ViewSource};

/// Why a daily-views request produced no result.
///
/// Data quality problems are not errors: they travel inside
/// [`ReconciledViews`](crate::models::ReconciledViews) as anomalies or
/// missing days.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Every configured source failed or timed out.
    #[error("no upstream source available ({})", describe(.sources, .detail))]
    UpstreamUnavailable {
        /// Sources that were tried, in rank order.
        sources: Vec<ViewSource>,
        /// One message per failed source.
        detail: Vec<String>,
    },

    /// The session or writer id does not map to a writer.
    #[error("identity not found: {0}")]
    IdentityNotFound(String),

    /// The date range was rejected before any upstream call.
    #[error("invalid range: {0}")]
    InvalidRange(String),

    /// The writer directory could not be queried.
    #[error("writer directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

fn describe(sources: &[ViewSource], detail: &[String]) -> String {
    if sources.is_empty() {
        return "no sources configured".to_string();
    }
    sources
        .iter()
        .zip(detail.iter().map(String::as_str).chain(std::iter::repeat("unknown")))
        .map(|(s, d)| format!("{s}: {d}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<RangeError> for ReconcileError {
    fn from(e: RangeError) -> Self {
        ReconcileError::InvalidRange(e.to_string())
    }
}

impl From<IdentityError> for ReconcileError {
    fn from(e: IdentityError) -> Self {
        match e {
            IdentityError::NotFound(what) => ReconcileError::IdentityNotFound(what),
            other => ReconcileError::DirectoryUnavailable(other.to_string()),
        }
    }
}
