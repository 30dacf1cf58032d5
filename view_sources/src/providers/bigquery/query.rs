//! SQL and request-body construction for the daily totals query.

use serde::Serialize;

use crate::{
    models::{day_range::DateRange, writer::{WriterIdentity, WriterKey}},
    providers::bigquery::BigQueryConfig,
};

/// Body of a `jobs.query` request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub use_legacy_sql: bool,
    pub parameter_mode: &'static str,
    pub query_parameters: Vec<QueryParameter>,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameter {
    pub name: &'static str,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParameterValue {
    pub value: String,
}

impl QueryParameter {
    fn new(name: &'static str, kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            name,
            parameter_type: ParameterType { kind },
            parameter_value: ParameterValue {
                value: value.into(),
            },
        }
    }
}

/// How long a single `jobs.query` / `getQueryResults` call may block server side.
pub const SERVER_WAIT_MS: u64 = 10_000;

/// Accepts `dataset.table`, `project.dataset.table`, and plain column names.
///
/// Identifiers come from config and are spliced into SQL text, so anything
/// outside `[A-Za-z0-9_.-]` is refused.
pub fn validate_identifier(kind: &str, ident: &str) -> Result<(), String> {
    if ident.is_empty() {
        return Err(format!("{kind} cannot be empty"));
    }
    if let Some(bad) = ident
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(format!("{kind} '{ident}' contains forbidden character '{bad}'"));
    }
    Ok(())
}

/// Builds the grouped-by-day SQL for the configured table.
pub fn build_sql(cfg: &BigQueryConfig) -> String {
    let date_expr = if cfg.date_is_timestamp {
        format!("DATE({}, @tz)", cfg.date_column)
    } else {
        cfg.date_column.clone()
    };
    format!(
        "SELECT CAST({date_expr} AS STRING) AS day, SUM({views}) AS views \
         FROM `{table}` \
         WHERE {writer} = @writer AND {date_expr} BETWEEN @start_date AND @end_date \
         GROUP BY day \
         ORDER BY day",
        views = cfg.views_column,
        table = cfg.table,
        writer = cfg.writer_column,
    )
}

/// Builds the full request body, binding writer, range and zone.
pub fn build_request(
    cfg: &BigQueryConfig,
    timezone: &str,
    writer: &WriterIdentity,
    range: DateRange,
) -> QueryRequest {
    let writer_param = match cfg.writer_key {
        WriterKey::Id => QueryParameter::new("writer", "INT64", writer.key(WriterKey::Id)),
        WriterKey::Name => QueryParameter::new("writer", "STRING", writer.key(WriterKey::Name)),
    };

    let mut query_parameters = vec![
        writer_param,
        QueryParameter::new("start_date", "DATE", range.start().format("%Y-%m-%d").to_string()),
        QueryParameter::new("end_date", "DATE", range.end().format("%Y-%m-%d").to_string()),
    ];
    if cfg.date_is_timestamp {
        query_parameters.push(QueryParameter::new("tz", "STRING", timezone));
    }

    QueryRequest {
        query: build_sql(cfg),
        use_legacy_sql: false,
        parameter_mode: "NAMED",
        query_parameters,
        timeout_ms: SERVER_WAIT_MS,
        location: cfg.location.clone(),
    }
}
