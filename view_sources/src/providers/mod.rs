//! Upstream store abstractions for view counts.
//!
//! Two kinds of stores feed the daily-views pipeline:
//!
//! - [`BatchStore`]: an authoritative warehouse holding one aggregated row per
//!   writer per day (BigQuery historical tables).
//! - [`RealtimeStore`]: a time-series store holding cumulative per-video
//!   counters sampled hourly (InfluxDB).
//!
//! Both traits are async and object safe so callers can hold
//! `Arc<dyn BatchStore>` / `Arc<dyn RealtimeStore>` and swap in fakes in tests.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use view_sources::models::{
//!     day_range::DateRange,
//!     views::{BatchDailyRow, BatchSemantics},
//!     writer::WriterIdentity,
//! };
//! use view_sources::providers::{BatchStore, ProviderError};
//!
//! struct EmptyWarehouse;
//!
//! #[async_trait]
//! impl BatchStore for EmptyWarehouse {
//!     fn semantics(&self) -> BatchSemantics {
//!         BatchSemantics::Daily
//!     }
//!
//!     async fn daily_rows(
//!         &self,
//!         _writer: &WriterIdentity,
//!         _range: DateRange,
//!     ) -> Result<Vec<BatchDailyRow>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod bigquery;
pub mod influxdb;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{
    day_range::DateRange,
    views::{BatchDailyRow, BatchSemantics, CumulativeSample},
    writer::WriterIdentity,
};

/// A warehouse of per-day aggregated view totals.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Whether returned rows hold daily figures or running totals.
    fn semantics(&self) -> BatchSemantics;

    /// Fetches one row per covered day in `range` for `writer`.
    ///
    /// Days the store has no data for are simply absent from the result.
    async fn daily_rows(
        &self,
        writer: &WriterIdentity,
        range: DateRange,
    ) -> Result<Vec<BatchDailyRow>, ProviderError>;
}

/// A time-series store of cumulative per-entity counters.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Fetches every sample for the writer's entities in `[from, to)`.
    async fn cumulative_samples(
        &self,
        writer: &WriterIdentity,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<CumulativeSample>, ProviderError>;
}

/// Errors that can occur during the creation of a store client.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// Token contains characters that can't go into a header.
    #[snafu(display("Invalid token format: {source}"))]
    InvalidToken {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },

    /// A configured identifier or literal is unsafe to splice into a query.
    #[snafu(display("Invalid store configuration: {message}"))]
    InvalidConfig {
        message: String,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a store implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, connect timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The upstream API answered with an error status or error payload.
    #[snafu(display("API error ({status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this store.
    #[snafu(display("Invalid parameters for store: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The response could not be decoded into rows or samples.
    #[snafu(display("Failed to decode response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// The store did not answer within the caller's budget.
    #[snafu(display("Timed out after {elapsed_ms} ms"))]
    Timeout {
        elapsed_ms: u64,
        backtrace: Backtrace,
    },

    /// An internal error occurred while processing data within the store client.
    #[snafu(display("Internal store error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during client configuration or initialization.
    #[snafu(display("Store initialization error: {source}"))]
    Init {
        #[snafu(backtrace)]
        source: ProviderInitError,
    },
}
