use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::models::views::BatchDailyRow;

/// Shared shape of `jobs.query` and `getQueryResults` responses.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(default)]
    pub job_complete: bool,
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub page_token: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TableRow {
    #[serde(rename = "f")]
    pub cells: Vec<TableCell>,
}

#[derive(Deserialize, Debug)]
pub struct TableCell {
    #[serde(rename = "v")]
    pub value: Option<Value>,
}

/// `{"error": {...}}` payload on non-2xx responses.
#[derive(Deserialize, Debug)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub message: String,
}

/// Converts `(day, views)` rows into [`BatchDailyRow`]s.
///
/// BigQuery ships INT64 as JSON strings and SUM over FLOAT64 columns as
/// exponent notation, so both are accepted. A NULL sum counts as zero.
pub fn decode_rows(rows: &[TableRow]) -> Result<Vec<BatchDailyRow>, String> {
    rows.iter().map(decode_row).collect()
}

fn decode_row(row: &TableRow) -> Result<BatchDailyRow, String> {
    let [day, views] = row.cells.as_slice() else {
        return Err(format!("expected 2 cells per row, got {}", row.cells.len()));
    };

    let date = match &day.value {
        Some(Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| format!("bad day '{s}': {e}"))?,
        other => return Err(format!("day cell is not a string: {other:?}")),
    };

    let views = match &views.value {
        None | Some(Value::Null) => 0,
        Some(Value::String(s)) => parse_count(s)?,
        Some(Value::Number(n)) => parse_count(&n.to_string())?,
        other => return Err(format!("views cell has unexpected type: {other:?}")),
    };

    Ok(BatchDailyRow { date, views })
}

fn parse_count(s: &str) -> Result<u64, String> {
    if let Ok(v) = s.parse::<u64>() {
        return Ok(v);
    }
    let f: f64 = s.parse().map_err(|_| format!("bad view count '{s}'"))?;
    if !f.is_finite() || f < 0.0 || f.round() >= u64::MAX as f64 {
        return Err(format!("view count out of range '{s}'"));
    }
    Ok(f.round() as u64)
}
