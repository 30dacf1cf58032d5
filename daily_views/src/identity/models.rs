//! Insertable/Queryable rows of the writer directory.

use diesel::prelude::*;
use view_sources::models::writer::WriterIdentity;

use crate::schema::{writer, writer_session};

/// A `writer` row.
#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = writer)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WriterRow {
    /// Writer id.
    pub id: i64,
    /// Display name.
    pub name: String,
}

impl From<WriterRow> for WriterIdentity {
    fn from(row: WriterRow) -> Self {
        WriterIdentity::new(row.id, row.name)
    }
}

/// A `writer_session` row.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = writer_session)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SessionRow {
    /// Opaque session token.
    pub session_id: String,
    /// Owning writer.
    pub writer_id: i64,
}
