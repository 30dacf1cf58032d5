use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use nonzero_ext::nonzero;
use reqwest::{Client, Response, header};
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::get_secret_env_var;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{
        day_range::DateRange,
        views::{BatchDailyRow, BatchSemantics},
        writer::WriterIdentity,
    },
    providers::{
        ApiSnafu, BatchStore, ClientBuildSnafu, DecodeSnafu, InvalidConfigSnafu,
        InvalidTokenSnafu, MissingEnvVarSnafu, ProviderError, ProviderInitError, ReqwestSnafu,
        bigquery::{
            BigQueryConfig, TOKEN_ENV,
            query::{SERVER_WAIT_MS, build_request, validate_identifier},
            response::{ErrorEnvelope, JobReference, QueryResponse, decode_rows},
        },
    },
};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// [`BatchStore`] backed by a BigQuery table of per-writer daily totals.
pub struct BigQueryStore {
    client: Client,
    config: BigQueryConfig,
    timezone: String,
    limiter: DirectLimiter,
    _token: SecretString,
}

impl BigQueryStore {
    /// Creates a new BigQuery store.
    ///
    /// Reads the access token from the `BIGQUERY_ACCESS_TOKEN` environment
    /// variable. `timezone` is the IANA name used to bucket timestamp columns.
    pub fn new(config: BigQueryConfig, timezone: &str) -> Result<Self, ProviderInitError> {
        let token = get_secret_env_var(TOKEN_ENV).context(MissingEnvVarSnafu)?;
        Self::with_token(config, timezone, token)
    }

    /// Same as [`BigQueryStore::new`] with an explicit token.
    pub fn with_token(
        config: BigQueryConfig,
        timezone: &str,
        token: SecretString,
    ) -> Result<Self, ProviderInitError> {
        for (kind, ident) in [
            ("project_id", &config.project_id),
            ("table", &config.table),
            ("date_column", &config.date_column),
            ("views_column", &config.views_column),
            ("writer_column", &config.writer_column),
        ] {
            if let Err(message) = validate_identifier(kind, ident) {
                return InvalidConfigSnafu { message }.fail();
            }
        }

        let mut auth =
            header::HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .context(InvalidTokenSnafu)?;
        auth.set_sensitive(true);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(5u32));

        Ok(Self {
            client,
            config,
            timezone: timezone.to_string(),
            limiter: RateLimiter::direct(Quota::per_second(rps)),
            _token: token,
        })
    }

    fn queries_url(&self) -> String {
        format!(
            "{}/projects/{}/queries",
            self.config.base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    async fn results_page(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse, ProviderError> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.config.base_url.trim_end_matches('/'),
            job.project_id,
            job.job_id
        );
        let mut query_params: Vec<(&str, String)> =
            vec![("timeoutMs", SERVER_WAIT_MS.to_string())];
        if let Some(token) = page_token {
            query_params.push(("pageToken", token.to_string()));
        }
        if let Some(location) = &job.location {
            query_params.push(("location", location.clone()));
        }

        self.limiter.until_ready().await;
        let response = self
            .client
            .get(url)
            .query(&query_params)
            .send()
            .await
            .context(ReqwestSnafu)?;
        read_response(response).await
    }
}

async fn read_response(response: Response) -> Result<QueryResponse, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown API error".to_string());
        let message = serde_json::from_str::<ErrorEnvelope>(&text)
            .map(|e| e.error.message)
            .unwrap_or(text);
        return ApiSnafu {
            status: status.as_u16(),
            message,
        }
        .fail();
    }
    response.json::<QueryResponse>().await.context(ReqwestSnafu)
}

#[async_trait]
impl BatchStore for BigQueryStore {
    fn semantics(&self) -> BatchSemantics {
        self.config.semantics
    }

    async fn daily_rows(
        &self,
        writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<Vec<BatchDailyRow>, ProviderError> {
        let request = build_request(&self.config, &self.timezone, writer, range);
        debug!(
            writer = %writer,
            start = %range.start(),
            end = %range.end(),
            "bigquery daily totals query"
        );

        self.limiter.until_ready().await;
        let response = self
            .client
            .post(self.queries_url())
            .json(&request)
            .send()
            .await
            .context(ReqwestSnafu)?;
        let mut page = read_response(response).await?;

        let mut all_rows: Vec<BatchDailyRow> = Vec::new();
        let mut job: Option<JobReference> = None;
        loop {
            if let Some(reference) = &page.job_reference {
                job = Some(reference.clone());
            }

            if page.job_complete {
                let rows = decode_rows(&page.rows).map_err(|message| {
                    DecodeSnafu { message }.build()
                })?;
                all_rows.extend(rows);
            }

            let more = !page.job_complete || page.page_token.is_some();
            if !more {
                break;
            }

            // A pending job or an extra page both continue through getQueryResults.
            let Some(job_ref) = job.as_ref() else {
                return ApiSnafu {
                    status: 200u16,
                    message: "incomplete query response without jobReference",
                }
                .fail();
            };
            let token = if page.job_complete {
                page.page_token.clone()
            } else {
                None
            };
            page = self.results_page(job_ref, token.as_deref()).await?;
        }

        debug!(writer = %writer, rows = all_rows.len(), "bigquery daily totals fetched");
        Ok(all_rows)
    }
}
