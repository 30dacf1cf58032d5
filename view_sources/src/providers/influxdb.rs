//! InfluxDB v2 client for the hourly cumulative per-video counters.

pub mod csv;
pub mod flux;
pub mod store;

use serde::{Deserialize, Serialize};

use crate::models::writer::WriterKey;

pub use store::InfluxStore;

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "INFLUXDB_TOKEN";

/// Bucket layout and client knobs for the real-time counters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfluxConfig {
    /// Base URL, e.g. `http://localhost:8086`.
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub measurement: String,
    pub field: String,
    /// Tag holding the writer key.
    pub writer_tag: String,
    #[serde(default)]
    pub writer_key: WriterKey,
    /// Tag identifying the counted entity (one series per video).
    pub entity_tag: String,
    /// Flux duration the raw points are reduced to with `last`.
    #[serde(default = "default_window")]
    pub window: String,
    #[serde(default = "default_rps")]
    pub requests_per_second: u32,
}

fn default_window() -> String {
    "1h".to_string()
}

fn default_rps() -> u32 {
    10
}
