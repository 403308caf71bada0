use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;

use crate::error::Result;

/// One SQLite connection shared by the registry and the history store, so
/// the record→job foreign key (and its cascade) lives in a single database.
pub type SharedConn = Arc<Mutex<Connection>>;

/// Open the database file with the standard pragmas applied.
pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// In-memory database with pragmas and schema already applied. Used by
/// tests and ephemeral tooling.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    init_db(&conn)?;
    Ok(conn)
}

/// Initialise the schema in `conn`.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS jobs (
            id          TEXT    NOT NULL PRIMARY KEY,
            name        TEXT    NOT NULL,
            engine      TEXT    NOT NULL,
            host        TEXT    NOT NULL,
            port        INTEGER NOT NULL,
            username    TEXT    NOT NULL,
            password    TEXT    NOT NULL,
            db_name     TEXT    NOT NULL,
            schedule    TEXT    NOT NULL,   -- canonical schedule string
            active      INTEGER NOT NULL DEFAULT 1,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS execution_records (
            id            TEXT    NOT NULL PRIMARY KEY,
            job_id        TEXT    NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
            started_at    TEXT    NOT NULL,
            success       INTEGER NOT NULL,
            artifact_path TEXT,
            error_message TEXT
        ) STRICT;

        -- History listing and the scheduler's last-run lookup both walk
        -- records per job, newest first.
        CREATE INDEX IF NOT EXISTS idx_records_job_started
            ON execution_records (job_id, started_at DESC);
        ",
    )?;
    Ok(())
}

/// Fixed-width RFC 3339 (millisecond precision, `Z` suffix) so lexicographic
/// ordering of the TEXT column is chronological.
pub(crate) fn format_ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
