use rusqlite::Connection;

use crate::error::Result;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS preferences (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS narrative_cache (
            subject       TEXT NOT NULL,
            locale        TEXT NOT NULL,
            payload       TEXT NOT NULL,
            written_at_ms INTEGER NOT NULL,
            PRIMARY KEY (subject, locale)
        );
        ",
    )?;

    Ok(())
}
