pub mod migrations;
pub mod queries;

use anyhow::Context;
use rusqlite::Connection;

/// Opens the local credential database and brings its schema up to date.
pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("failed to open credential database at {path}"))?;

    migrations::run_migrations(&conn)?;

    Ok(conn)
}
