//! Diesel queries for the writer directory.
//!
//! All functions take a borrowed [`SqliteConnection`]; callers decide where
//! the connection lives and which thread runs the query.

use diesel::prelude::*;
use view_sources::models::writer::WriterIdentity;

use super::models::{SessionRow, WriterRow};
use crate::schema::{writer, writer_session};

/// Inserts or renames a writer.
pub fn upsert_writer(conn: &mut SqliteConnection, id: i64, name: &str) -> QueryResult<()> {
    let row = WriterRow {
        id,
        name: name.to_string(),
    };
    diesel::insert_into(writer::table)
        .values(&row)
        .on_conflict(writer::id)
        .do_update()
        .set(writer::name.eq(name))
        .execute(conn)?;
    Ok(())
}

/// Binds a session token to a writer, replacing any previous binding.
pub fn upsert_session(
    conn: &mut SqliteConnection,
    session_id: &str,
    writer_id: i64,
) -> QueryResult<()> {
    let row = SessionRow {
        session_id: session_id.to_string(),
        writer_id,
    };
    diesel::insert_into(writer_session::table)
        .values(&row)
        .on_conflict(writer_session::session_id)
        .do_update()
        .set(writer_session::writer_id.eq(writer_id))
        .execute(conn)?;
    Ok(())
}

/// Writer by id.
pub fn find_writer(conn: &mut SqliteConnection, id: i64) -> QueryResult<Option<WriterIdentity>> {
    writer::table
        .find(id)
        .select(WriterRow::as_select())
        .first(conn)
        .optional()
        .map(|row| row.map(Into::into))
}

/// Writer owning a session.
pub fn find_session(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> QueryResult<Option<WriterIdentity>> {
    writer_session::table
        .inner_join(writer::table)
        .filter(writer_session::session_id.eq(session_id))
        .select(WriterRow::as_select())
        .first(conn)
        .optional()
        .map(|row| row.map(Into::into))
}

/// Every writer and every session binding, for warming a cache.
pub fn load_all(
    conn: &mut SqliteConnection,
) -> QueryResult<(Vec<WriterIdentity>, Vec<SessionRow>)> {
    let writers = writer::table
        .select(WriterRow::as_select())
        .order(writer::id)
        .load(conn)?
        .into_iter()
        .map(Into::into)
        .collect();
    let sessions = writer_session::table
        .select(SessionRow::as_select())
        .load(conn)?;
    Ok((writers, sessions))
}
