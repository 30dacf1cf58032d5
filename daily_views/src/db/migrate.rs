//! Embedded writer-directory migrations.

use anyhow::anyhow;
use diesel::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use super::connection::connect_sqlite;

/// Embedded Diesel migrations bundled with this crate.
///
/// These are applied by [`run_sqlite`] to bring the writer directory schema up to date.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies pending migrations on an open connection. Returns how many ran.
pub fn run_pending(conn: &mut SqliteConnection) -> anyhow::Result<usize> {
    let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| anyhow!(e))?;
    for version in &applied {
        info!(%version, "applied writer directory migration");
    }
    Ok(applied.len())
}

/// Runs pending Diesel migrations on a SQLite database at the given URL.
pub fn run_sqlite(url: &str) -> anyhow::Result<usize> {
    let mut conn = connect_sqlite(url)?;
    run_pending(&mut conn)
}
