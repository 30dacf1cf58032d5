//! BigQuery REST client for the historical daily-views tables.
//!
//! Queries go through `jobs.query` with named parameters; long-running jobs
//! and multi-page results are drained through `getQueryResults`.

pub mod query;
pub mod response;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::models::{views::BatchSemantics, writer::WriterKey};

pub use store::BigQueryStore;

/// Environment variable holding the OAuth access token.
pub const TOKEN_ENV: &str = "BIGQUERY_ACCESS_TOKEN";

const DEFAULT_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Table layout and client knobs for one historical views table.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BigQueryConfig {
    pub project_id: String,
    /// Fully-qualified `dataset.table`.
    pub table: String,
    pub date_column: String,
    /// Set when `date_column` is a TIMESTAMP that must be bucketed into
    /// days in the canonical zone.
    #[serde(default)]
    pub date_is_timestamp: bool,
    pub views_column: String,
    pub writer_column: String,
    #[serde(default)]
    pub writer_key: WriterKey,
    #[serde(default)]
    pub semantics: BatchSemantics,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_rps() -> u32 {
    5
}
