use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::params;
use tracing::{debug, instrument};

use yedek_core::{JobId, RecordId};

use crate::db::{format_ts, parse_ts, SharedConn};
use crate::error::{Result, StoreError};
use crate::types::{ExecutionRecord, NewRecord};

/// Append-only store of backup execution outcomes.
///
/// Records are immutable once written; there is deliberately no update
/// operation. Rows disappear only when their job is deleted (cascade).
pub struct HistoryStore {
    db: SharedConn,
}

impl HistoryStore {
    /// Wrap an already-initialised connection.
    pub fn new(db: SharedConn) -> Self {
        Self { db }
    }

    #[instrument(skip(self, record), fields(job_id = %record.job_id, success = record.success))]
    pub fn append(&self, record: &NewRecord) -> Result<ExecutionRecord> {
        let id = RecordId::new();
        // Millisecond precision matches the storage format, so the returned
        // record compares equal to a later read-back.
        let started_at = record.started_at.trunc_subsecs(3);

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO execution_records
             (id, job_id, started_at, success, artifact_path, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.as_str(),
                record.job_id.as_str(),
                format_ts(&started_at),
                record.success as i64,
                record.artifact_path,
                record.error_message,
            ],
        )?;
        debug!(record_id = %id, "execution record appended");

        Ok(ExecutionRecord {
            id,
            job_id: record.job_id.clone(),
            started_at,
            success: record.success,
            artifact_path: record.artifact_path.clone(),
            error_message: record.error_message.clone(),
        })
    }

    /// All records for one job, newest first.
    pub fn list_for(&self, job_id: &JobId) -> Result<Vec<ExecutionRecord>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, job_id, started_at, success, artifact_path, error_message
             FROM execution_records
             WHERE job_id = ?1
             ORDER BY started_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(params![job_id.as_str()], row_to_record)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    pub fn get(&self, id: &RecordId) -> Result<ExecutionRecord> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, job_id, started_at, success, artifact_path, error_message
             FROM execution_records WHERE id = ?1",
            params![id.as_str()],
            row_to_record,
        ) {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::RecordNotFound {
                id: id.to_string(),
            }),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Start time of the most recent attempt, used by the scheduler to
    /// decide due-ness.
    pub fn last_started_at(&self, job_id: &JobId) -> Result<Option<DateTime<Utc>>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT started_at FROM execution_records
             WHERE job_id = ?1
             ORDER BY started_at DESC
             LIMIT 1",
            params![job_id.as_str()],
            |row| row.get::<_, String>(0),
        ) {
            Ok(raw) => Ok(Some(parse_ts(0, raw)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Artifact bytes for a successful record.
    ///
    /// Failed runs never expose an artifact, even when a partial file path
    /// was stored.
    #[instrument(skip(self), fields(record_id = %id))]
    pub fn artifact_bytes(&self, id: &RecordId) -> Result<Vec<u8>> {
        let record = self.get(id)?;
        if !record.success {
            return Err(StoreError::ArtifactNotFound { id: id.to_string() });
        }
        let path = match record.artifact_path {
            Some(p) => p,
            None => return Err(StoreError::ArtifactNotFound { id: id.to_string() }),
        };
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::ArtifactNotFound { id: id.to_string() })
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Map a SQLite row to an `ExecutionRecord`.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    Ok(ExecutionRecord {
        id: RecordId::from(row.get::<_, String>(0)?),
        job_id: JobId::from(row.get::<_, String>(1)?),
        started_at: parse_ts(2, row.get(2)?)?,
        success: row.get::<_, i64>(3)? != 0,
        artifact_path: row.get(4)?,
        error_message: row.get(5)?,
    })
}
