//! Lock-free, read-mostly identity cache with a time-to-live.
//!
//! Readers load an `Arc<Snapshot>` with no lock contention. Writers swap in a
//! new snapshot, either wholesale ([`IdentityCache::replace`]) after reading
//! the whole directory, or one entry at a time ([`IdentityCache::insert_writer`],
//! [`IdentityCache::insert_session`]) after a miss was answered by the database.
//!
//! Every entry remembers when it was stored. Once older than the cache's TTL
//! it reads as a miss, so a revoked session or renamed writer is looked up
//! again. Expired entries are dropped whenever a new snapshot is built.
//!
//! Implementation notes:
//! - Uses `arc-swap` for atomic pointer swaps + cheap reads (no RwLock).
//! - Single-entry inserts clone the snapshot under `rcu`; the directory is
//!   small and misses are rare once warm.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use arc_swap::ArcSwap;
use view_sources::models::writer::WriterIdentity;

#[derive(Debug, Clone)]
struct Entry<T> {
    value: T,
    stored_at: Instant,
}

impl<T> Entry<T> {
    fn new(value: T, stored_at: Instant) -> Self {
        Self { value, stored_at }
    }

    fn fresh(&self, ttl: Duration) -> Option<&T> {
        (self.stored_at.elapsed() < ttl).then_some(&self.value)
    }
}

/// What the cache holds at one point in time.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    writers: HashMap<i64, Entry<WriterIdentity>>,
    sessions: HashMap<String, Entry<i64>>,
}

impl Snapshot {
    /// Builds a snapshot from directory contents, stamped with the current
    /// time.
    pub fn new(
        writers: impl IntoIterator<Item = WriterIdentity>,
        sessions: impl IntoIterator<Item = (String, i64)>,
    ) -> Self {
        let now = Instant::now();
        Self {
            writers: writers
                .into_iter()
                .map(|w| (w.writer_id, Entry::new(w, now)))
                .collect(),
            sessions: sessions
                .into_iter()
                .map(|(token, id)| (token, Entry::new(id, now)))
                .collect(),
        }
    }

    /// Number of cached writers.
    pub fn writer_count(&self) -> usize {
        self.writers.len()
    }

    fn prune(&mut self, ttl: Duration) {
        self.writers.retain(|_, e| e.fresh(ttl).is_some());
        self.sessions.retain(|_, e| e.fresh(ttl).is_some());
    }
}

/// Instance-owned cache; each resolver has its own.
#[derive(Debug)]
pub struct IdentityCache {
    snap: ArcSwap<Snapshot>,
    ttl: Duration,
}

impl IdentityCache {
    /// Starts empty; entries expire `ttl` after they were stored.
    pub fn new(ttl: Duration) -> Self {
        Self {
            snap: ArcSwap::from_pointee(Snapshot::default()),
            ttl,
        }
    }

    /// Cached writer by id.
    pub fn writer(&self, writer_id: i64) -> Option<WriterIdentity> {
        self.snap.load().writers.get(&writer_id)?.fresh(self.ttl).cloned()
    }

    /// Cached writer owning `session_id`. A session pointing at a writer that
    /// is not cached (or has expired) counts as a miss.
    pub fn session(&self, session_id: &str) -> Option<WriterIdentity> {
        let snap = self.snap.load();
        let id = snap.sessions.get(session_id)?.fresh(self.ttl)?;
        snap.writers.get(id)?.fresh(self.ttl).cloned()
    }

    /// Atomically replaces the whole snapshot.
    pub fn replace(&self, snapshot: Snapshot) {
        self.snap.store(Arc::new(snapshot));
    }

    /// Adds or updates one writer.
    pub fn insert_writer(&self, writer: WriterIdentity) {
        let now = Instant::now();
        self.snap.rcu(|old| {
            let mut next = Snapshot::clone(old);
            next.prune(self.ttl);
            next.writers.insert(writer.writer_id, Entry::new(writer.clone(), now));
            next
        });
    }

    /// Adds or updates one session binding together with its writer.
    pub fn insert_session(&self, session_id: &str, writer: WriterIdentity) {
        let now = Instant::now();
        self.snap.rcu(|old| {
            let mut next = Snapshot::clone(old);
            next.prune(self.ttl);
            let binding = Entry::new(writer.writer_id, now);
            next.sessions.insert(session_id.to_string(), binding);
            next.writers.insert(writer.writer_id, Entry::new(writer.clone(), now));
            next
        });
    }

    /// Drops a session binding the directory no longer knows.
    pub fn evict_session(&self, session_id: &str) {
        if !self.snap.load().sessions.contains_key(session_id) {
            return;
        }
        self.snap.rcu(|old| {
            let mut next = Snapshot::clone(old);
            next.sessions.remove(session_id);
            next
        });
    }

    /// Drops a writer the directory no longer knows, with its sessions.
    pub fn evict_writer(&self, writer_id: i64) {
        if !self.snap.load().writers.contains_key(&writer_id) {
            return;
        }
        self.snap.rcu(|old| {
            let mut next = Snapshot::clone(old);
            next.writers.remove(&writer_id);
            next.sessions.retain(|_, e| e.value != writer_id);
            next
        });
    }

    /// Entries currently held, fresh or not yet pruned.
    pub fn entry_count(&self) -> usize {
        let snap = self.snap.load();
        snap.writers.len() + snap.sessions.len()
    }
}
