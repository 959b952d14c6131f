use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::AppError;

// ── Credentials ──

pub fn get_credential(conn: &Connection, key: &str) -> Result<Option<String>, AppError> {
    let value = conn
        .query_row(
            "SELECT value FROM credentials WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_credential(conn: &Connection, key: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO credentials (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

pub fn delete_credential(conn: &Connection, key: &str) -> Result<bool, AppError> {
    let removed = conn.execute("DELETE FROM credentials WHERE key = ?1", params![key])?;
    Ok(removed > 0)
}
