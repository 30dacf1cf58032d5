use std::num::NonZeroU32;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use nonzero_ext::nonzero;
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use shared_utils::env::get_secret_env_var;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{views::CumulativeSample, writer::WriterIdentity},
    providers::{
        ApiSnafu, ClientBuildSnafu, DecodeSnafu, InvalidConfigSnafu, InvalidTokenSnafu,
        MissingEnvVarSnafu, ProviderError, ProviderInitError, RealtimeStore, ReqwestSnafu,
        ValidationSnafu,
        influxdb::{
            InfluxConfig, TOKEN_ENV,
            csv::{Decoded, decode},
            flux::{build_query, validate_duration},
        },
    },
};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    dialect: Dialect,
}

#[derive(Serialize)]
struct Dialect {
    header: bool,
    annotations: Vec<String>,
    delimiter: &'static str,
}

/// [`RealtimeStore`] backed by an InfluxDB v2 bucket.
pub struct InfluxStore {
    client: Client,
    config: InfluxConfig,
    limiter: DirectLimiter,
    _token: SecretString,
}

impl InfluxStore {
    /// Creates a new InfluxDB store, reading the token from `INFLUXDB_TOKEN`.
    pub fn new(config: InfluxConfig) -> Result<Self, ProviderInitError> {
        let token = get_secret_env_var(TOKEN_ENV).context(MissingEnvVarSnafu)?;
        Self::with_token(config, token)
    }

    /// Same as [`InfluxStore::new`] with an explicit token.
    pub fn with_token(
        config: InfluxConfig,
        token: SecretString,
    ) -> Result<Self, ProviderInitError> {
        if let Err(message) = validate_duration(&config.window) {
            return InvalidConfigSnafu { message }.fail();
        }
        if config.url.trim().is_empty() || config.org.trim().is_empty() {
            return InvalidConfigSnafu {
                message: "url and org are required",
            }
            .fail();
        }

        let mut auth = header::HeaderValue::from_str(&format!("Token {}", token.expose_secret()))
            .context(InvalidTokenSnafu)?;
        auth.set_sensitive(true);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/csv"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .context(ClientBuildSnafu)?;

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(10u32));

        Ok(Self {
            client,
            config,
            limiter: RateLimiter::direct(Quota::per_second(rps)),
            _token: token,
        })
    }

    fn query_url(&self) -> String {
        format!("{}/api/v2/query", self.config.url.trim_end_matches('/'))
    }
}

#[async_trait]
impl RealtimeStore for InfluxStore {
    async fn cumulative_samples(
        &self,
        writer: &WriterIdentity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CumulativeSample>, ProviderError> {
        if to <= from {
            return ValidationSnafu {
                message: format!("empty time window {from}..{to}"),
            }
            .fail();
        }

        let flux = build_query(&self.config, writer, from, to);
        debug!(writer = %writer, %from, %to, "influx cumulative query");

        let body = QueryBody {
            query: &flux,
            kind: "flux",
            dialect: Dialect {
                header: true,
                annotations: Vec::new(),
                delimiter: ",",
            },
        };

        self.limiter.until_ready().await;
        let response = self
            .client
            .post(self.query_url())
            .query(&[("org", self.config.org.as_str())])
            .json(&body)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let text = response.text().await.context(ReqwestSnafu)?;
        if !status.is_success() {
            return ApiSnafu {
                status: status.as_u16(),
                message: text,
            }
            .fail();
        }

        match decode(&text, &self.config.entity_tag) {
            Ok(Decoded::Samples(samples)) => {
                debug!(writer = %writer, samples = samples.len(), "influx samples fetched");
                Ok(samples)
            }
            Ok(Decoded::Error(message)) => ApiSnafu {
                status: status.as_u16(),
                message,
            }
            .fail(),
            Err(message) => DecodeSnafu { message }.fail(),
        }
    }
}
