//! Decoding of InfluxDB query responses (annotated CSV without annotations).
//!
//! A response is a sequence of tables separated by blank lines; each table
//! starts with its own header row. Rows carry a leading empty column, then
//! `result`, `table` and the kept columns.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::models::views::CumulativeSample;

/// Outcome of decoding a response body.
#[derive(Debug, PartialEq)]
pub enum Decoded {
    Samples(Vec<CumulativeSample>),
    /// The body was an in-band error table.
    Error(String),
}

/// Splits one CSV record, honoring double-quoted fields with `""` escapes.
///
/// Works on a single physical line: a quoted field containing a line break
/// is not reassembled. The kept columns (timestamps, numbers, tag values)
/// never carry one.
pub fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

struct Header {
    time: usize,
    value: usize,
    entity: usize,
}

fn parse_header(fields: &[String], entity_tag: &str) -> Result<Header, String> {
    let find = |name: &str| {
        fields
            .iter()
            .position(|f| f == name)
            .ok_or_else(|| format!("response header lacks column '{name}'"))
    };
    Ok(Header {
        time: find("_time")?,
        value: find("_value")?,
        entity: find(entity_tag)?,
    })
}

fn parse_value(raw: &str) -> Option<u64> {
    if let Ok(v) = raw.parse::<u64>() {
        return Some(v);
    }
    match raw.parse::<f64>() {
        // `u64::MAX as f64` rounds up to 2^64, which is already out of range.
        Ok(f) if f.is_finite() && f >= 0.0 && f.round() < u64::MAX as f64 => {
            Some(f.round() as u64)
        }
        _ => None,
    }
}

/// Decodes a response body into samples.
///
/// Negative, out-of-range or non-numeric values are skipped with a warning;
/// structural problems (missing columns, bad timestamps) are errors.
pub fn decode(body: &str, entity_tag: &str) -> Result<Decoded, String> {
    let mut samples = Vec::new();
    let mut header: Option<Header> = None;
    let mut lines = body.lines().map(|l| l.trim_end_matches('\r'));

    while let Some(line) = lines.next() {
        if line.is_empty() {
            header = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let fields = split_record(line);
        if header.is_none() {
            if let Some(pos) = fields.iter().position(|f| f == "error") {
                // In-band error table: the message sits on the next row.
                let message = lines
                    .next()
                    .map(split_record)
                    .and_then(|row| row.get(pos).cloned())
                    .unwrap_or_else(|| "unknown query error".to_string());
                return Ok(Decoded::Error(message));
            }
            header = Some(parse_header(&fields, entity_tag)?);
            continue;
        }
        let Some(h) = header.as_ref() else {
            continue;
        };

        let get = |idx: usize| fields.get(idx).map(String::as_str).unwrap_or("");
        let timestamp = DateTime::parse_from_rfc3339(get(h.time))
            .map_err(|e| format!("bad _time '{}': {e}", get(h.time)))?
            .with_timezone(&Utc);
        let entity_id = get(h.entity);
        if entity_id.is_empty() {
            warn!(%timestamp, "sample without entity tag skipped");
            continue;
        }
        let Some(cumulative_views) = parse_value(get(h.value)) else {
            warn!(entity_id, value = get(h.value), "unusable cumulative value skipped");
            continue;
        };

        samples.push(CumulativeSample {
            entity_id: entity_id.to_string(),
            timestamp,
            cumulative_views,
        });
    }

    Ok(Decoded::Samples(samples))
}
