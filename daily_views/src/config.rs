//! Service configuration: parsing, normalization, and loading.
//!
//! One TOML file describes the whole pipeline:
//! - `[reconcile]`: canonical time zone and request limits
//! - `[batch]`: the BigQuery historical table ([`BigQueryConfig`])
//! - `[realtime]`: the InfluxDB counters bucket ([`InfluxConfig`])
//! - `[identity]`: where the writer directory lives
//!
//! Secrets never live here. Tokens come from the environment when the clients
//! are built, and `DATABASE_URL` overrides `identity.database_url`.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_config_str`]
//! - Parse + normalize from a file path: [`load_config_path`]
//! - Normalization alone: [`normalize_config`]

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use shared_utils::env::get_optional_env_var;
use toml::from_str;
use view_sources::providers::{bigquery::BigQueryConfig, influxdb::InfluxConfig};

use crate::tz::parse_tz;

/// Environment variable overriding [`IdentityCfg::database_url`].
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Upper bound for [`ReconcileCfg::realtime_lookback_days`].
pub const MAX_LOOKBACK_DAYS: u32 = 366;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Reconciliation knobs.
    #[serde(default)]
    pub reconcile: ReconcileCfg,
    /// Authoritative batch source.
    pub batch: BigQueryConfig,
    /// Real-time fallback source.
    pub realtime: InfluxConfig,
    /// Writer directory.
    pub identity: IdentityCfg,
}

/// `[reconcile]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileCfg {
    /// IANA zone every calendar day refers to.
    #[serde(default = "default_tz")]
    pub canonical_timezone: String,
    /// Longest accepted request, in days.
    #[serde(default = "default_max_range_days")]
    pub max_range_days: u32,
    /// Budget for each upstream call.
    #[serde(default = "default_timeout_ms")]
    pub upstream_timeout_ms: u64,
    /// Days of real-time samples fetched before the range for baselines.
    #[serde(default = "default_lookback")]
    pub realtime_lookback_days: u32,
}

impl Default for ReconcileCfg {
    fn default() -> Self {
        Self {
            canonical_timezone: default_tz(),
            max_range_days: default_max_range_days(),
            upstream_timeout_ms: default_timeout_ms(),
            realtime_lookback_days: default_lookback(),
        }
    }
}

fn default_tz() -> String {
    "UTC".to_string()
}

fn default_max_range_days() -> u32 {
    366
}

fn default_timeout_ms() -> u64 {
    8_000
}

fn default_lookback() -> u32 {
    7
}

/// `[identity]` section.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityCfg {
    /// SQLite path of the writer directory.
    pub database_url: String,
    /// How long a resolved writer or session stays cached.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// Summary of changes performed during normalization.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct NormalizationReport {
    /// String fields that lost surrounding whitespace.
    pub fields_trimmed: usize,
    /// Set when `DATABASE_URL` replaced the configured directory path.
    pub database_url_from_env: bool,
}

fn trim_in_place(
    field: &mut String,
    name: &str,
    report: &mut NormalizationReport,
) -> anyhow::Result<()> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        bail!("{name} cannot be empty");
    }
    if trimmed.len() != field.len() {
        *field = trimmed.to_string();
        report.fields_trimmed += 1;
    }
    Ok(())
}

/// Normalize a configuration in place.
///
/// What normalization does:
/// - Trim every required string; reject empty ones
/// - Validate the time zone name and store its canonical spelling
/// - Apply the `DATABASE_URL` override
///
/// Errors:
/// - Empty required fields, unknown time zone
/// - Zero `max_range_days`, `upstream_timeout_ms` or `requests_per_second`
/// - Zero `cache_ttl_secs`
/// - `realtime_lookback_days` above [`MAX_LOOKBACK_DAYS`]
pub fn normalize_config(cfg: &mut Config) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    let r = &mut cfg.reconcile;
    trim_in_place(&mut r.canonical_timezone, "reconcile.canonical_timezone", &mut report)?;
    let tz = parse_tz(&r.canonical_timezone)?;
    r.canonical_timezone = tz.name().to_string();
    if r.max_range_days == 0 {
        bail!("reconcile.max_range_days must be at least 1");
    }
    if r.upstream_timeout_ms == 0 {
        bail!("reconcile.upstream_timeout_ms must be positive");
    }
    if r.realtime_lookback_days > MAX_LOOKBACK_DAYS {
        bail!(
            "reconcile.realtime_lookback_days must be at most {MAX_LOOKBACK_DAYS}, got {}",
            r.realtime_lookback_days
        );
    }

    let b = &mut cfg.batch;
    for (field, name) in [
        (&mut b.project_id, "batch.project_id"),
        (&mut b.table, "batch.table"),
        (&mut b.date_column, "batch.date_column"),
        (&mut b.views_column, "batch.views_column"),
        (&mut b.writer_column, "batch.writer_column"),
        (&mut b.base_url, "batch.base_url"),
    ] {
        trim_in_place(field, name, &mut report)?;
    }
    if b.requests_per_second == 0 {
        bail!("batch.requests_per_second must be positive");
    }

    let rt = &mut cfg.realtime;
    for (field, name) in [
        (&mut rt.url, "realtime.url"),
        (&mut rt.org, "realtime.org"),
        (&mut rt.bucket, "realtime.bucket"),
        (&mut rt.measurement, "realtime.measurement"),
        (&mut rt.field, "realtime.field"),
        (&mut rt.writer_tag, "realtime.writer_tag"),
        (&mut rt.entity_tag, "realtime.entity_tag"),
        (&mut rt.window, "realtime.window"),
    ] {
        trim_in_place(field, name, &mut report)?;
    }
    if rt.requests_per_second == 0 {
        bail!("realtime.requests_per_second must be positive");
    }

    if let Some(url) = get_optional_env_var(DATABASE_URL_ENV) {
        cfg.identity.database_url = url;
        report.database_url_from_env = true;
    }
    trim_in_place(&mut cfg.identity.database_url, "identity.database_url", &mut report)?;
    if cfg.identity.cache_ttl_secs == 0 {
        bail!("identity.cache_ttl_secs must be positive");
    }

    Ok(report)
}

/// Parse and normalize a configuration from a TOML string.
pub fn load_config_str(toml_str: &str) -> anyhow::Result<Config> {
    let mut cfg: Config = from_str(toml_str).context("failed to parse config TOML")?;
    let report = normalize_config(&mut cfg).context("normalize_config failed")?;
    tracing::debug!(?report, "config normalized");
    Ok(cfg)
}

/// Read a config TOML file from disk, parse, and normalize it.
///
/// See [`load_config_str`] for details.
pub fn load_config_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read config file {}", path.as_ref().display()))?;
    load_config_str(&text)
}
