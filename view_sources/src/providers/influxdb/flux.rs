//! Flux query construction.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{models::writer::WriterIdentity, providers::influxdb::InfluxConfig};

/// Escapes a value for use inside a Flux string literal.
///
/// Besides quotes and backslashes, `${` would start string interpolation.
pub fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '$' => out.push_str("\\$"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Checks a Flux duration literal such as `1h`, `30m` or `1d`.
pub fn validate_duration(raw: &str) -> Result<(), String> {
    let digits = raw.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return Err(format!("duration '{raw}' must start with digits"));
    }
    match &raw[digits..] {
        "ns" | "us" | "ms" | "s" | "m" | "h" | "d" | "w" => Ok(()),
        unit => Err(format!("duration '{raw}' has unknown unit '{unit}'")),
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Builds the per-entity hourly `last` query over `[from, to)`.
///
/// Windows are stamped with their start so a sample taken late in the day
/// stays on that day.
pub fn build_query(
    cfg: &InfluxConfig,
    writer: &WriterIdentity,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> String {
    format!(
        r#"from(bucket: "{bucket}")
  |> range(start: {start}, stop: {stop})
  |> filter(fn: (r) => r._measurement == "{measurement}" and r._field == "{field}")
  |> filter(fn: (r) => r["{writer_tag}"] == "{writer}")
  |> group(columns: ["{entity_tag}"])
  |> aggregateWindow(every: {window}, fn: last, createEmpty: false, timeSrc: "_start")
  |> keep(columns: ["_time", "_value", "{entity_tag}"])"#,
        bucket = escape_string(&cfg.bucket),
        start = rfc3339(from),
        stop = rfc3339(to),
        measurement = escape_string(&cfg.measurement),
        field = escape_string(&cfg.field),
        writer_tag = escape_string(&cfg.writer_tag),
        writer = escape_string(&writer.key(cfg.writer_key)),
        entity_tag = escape_string(&cfg.entity_tag),
        window = cfg.window,
    )
}
