//! Writer identity as the upstream stores see it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A writer resolved from a login/session.
///
/// Upstream tables key writers inconsistently (some by integer id, some by
/// display name), so both halves travel together.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterIdentity {
    /// Integer writer id from the relational store.
    pub writer_id: i64,
    /// Writer display name as used by name-keyed tables.
    pub writer_name: String,
}

impl WriterIdentity {
    pub fn new(writer_id: i64, writer_name: impl Into<String>) -> Self {
        Self {
            writer_id,
            writer_name: writer_name.into(),
        }
    }

    /// Returns the value an upstream expects for the given key kind.
    pub fn key(&self, key: WriterKey) -> String {
        match key {
            WriterKey::Id => self.writer_id.to_string(),
            WriterKey::Name => self.writer_name.clone(),
        }
    }
}

impl fmt::Display for WriterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.writer_name, self.writer_id)
    }
}

/// Which half of a [`WriterIdentity`] an upstream table is keyed by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriterKey {
    #[default]
    Id,
    Name,
}

/// Opaque session token issued at login.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
