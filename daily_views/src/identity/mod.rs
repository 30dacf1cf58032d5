//! Writer identity resolution.
//!
//! A request arrives with either a session token or a writer id; both have
//! to become a full [`WriterIdentity`] (id and display name) before any
//! upstream store can be queried, since tables key writers inconsistently.
//!
//! - [`IdentityResolver`]: the async seam the service depends on.
//! - [`resolver::DirectoryResolver`]: SQLite-backed implementation with a
//!   read-mostly [`cache::IdentityCache`] in front of it.
//! - [`directory`]: Diesel queries against the `writer` / `writer_session` tables.

pub mod cache;
pub mod directory;
pub mod models;
pub mod resolver;

use async_trait::async_trait;
use thiserror::Error;
use view_sources::models::writer::{SessionId, WriterIdentity};

/// Errors raised while resolving an identity.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// No writer matches the session or id.
    #[error("{0} not found")]
    NotFound(String),

    /// The directory query failed.
    #[error("writer directory query failed: {0}")]
    Database(#[from] diesel::result::Error),

    /// The directory connection could not be used.
    #[error("writer directory connection failed: {0}")]
    Connection(String),
}

/// Maps sessions and writer ids to writers.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Writer owning `session`.
    async fn resolve_session(&self, session: &SessionId) -> Result<WriterIdentity, IdentityError>;

    /// Writer with id `writer_id`.
    async fn resolve_writer(&self, writer_id: i64) -> Result<WriterIdentity, IdentityError>;
}

/// Short, non-secret label for a session token in messages and logs.
pub fn session_label(session: &SessionId) -> String {
    let head: String = session.as_str().chars().take(4).collect();
    format!("session {head}***")
}
