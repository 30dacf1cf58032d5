//! SQLite-backed [`IdentityResolver`].

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use diesel::SqliteConnection;
use tracing::debug;
use view_sources::models::writer::{SessionId, WriterIdentity};

use super::{
    IdentityError, IdentityResolver,
    cache::{IdentityCache, Snapshot},
    directory, session_label,
};
use crate::db::{connection::connect_sqlite, migrate};

/// Resolves identities from the writer directory, caching every hit for the
/// configured TTL. A lookup the directory answers with "not found" evicts
/// whatever the cache still held for that key.
///
/// Diesel's SQLite connection is synchronous, so queries run on the blocking
/// pool behind a mutex.
pub struct DirectoryResolver {
    conn: Arc<Mutex<SqliteConnection>>,
    cache: Arc<IdentityCache>,
}

impl DirectoryResolver {
    /// Opens (and migrates) the directory at `database_url`; cached entries
    /// live for `cache_ttl`.
    pub fn open(database_url: &str, cache_ttl: Duration) -> anyhow::Result<Self> {
        let mut conn = connect_sqlite(database_url)?;
        migrate::run_pending(&mut conn)?;
        Ok(Self::from_connection(conn, cache_ttl))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: SqliteConnection, cache_ttl: Duration) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: Arc::new(IdentityCache::new(cache_ttl)),
        }
    }

    /// The resolver's cache.
    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    /// Reloads the whole directory into the cache. Returns the writer count.
    pub async fn refresh(&self) -> Result<usize, IdentityError> {
        let (writers, sessions) = self.with_conn(directory::load_all).await?;
        let snapshot = Snapshot::new(
            writers,
            sessions.into_iter().map(|s| (s.session_id, s.writer_id)),
        );
        let count = snapshot.writer_count();
        self.cache.replace(snapshot);
        debug!(writers = count, "identity cache refreshed");
        Ok(count)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, IdentityError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> diesel::QueryResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| {
                IdentityError::Connection("directory connection lock poisoned".into())
            })?;
            f(&mut *guard).map_err(IdentityError::from)
        })
        .await
        .map_err(|e| IdentityError::Connection(e.to_string()))?
    }
}

#[async_trait]
impl IdentityResolver for DirectoryResolver {
    async fn resolve_session(&self, session: &SessionId) -> Result<WriterIdentity, IdentityError> {
        if let Some(w) = self.cache.session(session.as_str()) {
            return Ok(w);
        }

        let token = session.as_str().to_string();
        let found = self
            .with_conn(move |conn| directory::find_session(conn, &token))
            .await?;
        match found {
            Some(w) => {
                self.cache.insert_session(session.as_str(), w.clone());
                debug!(
                    writer = %w,
                    cached = self.cache.entry_count(),
                    "session resolved from directory"
                );
                Ok(w)
            }
            None => {
                self.cache.evict_session(session.as_str());
                Err(IdentityError::NotFound(session_label(session)))
            }
        }
    }

    async fn resolve_writer(&self, writer_id: i64) -> Result<WriterIdentity, IdentityError> {
        if let Some(w) = self.cache.writer(writer_id) {
            return Ok(w);
        }

        match self
            .with_conn(move |conn| directory::find_writer(conn, writer_id))
            .await?
        {
            Some(w) => {
                self.cache.insert_writer(w.clone());
                debug!(
                    writer = %w,
                    cached = self.cache.entry_count(),
                    "writer resolved from directory"
                );
                Ok(w)
            }
            None => {
                self.cache.evict_writer(writer_id);
                Err(IdentityError::NotFound(format!("writer {writer_id}")))
            }
        }
    }
}
