use std::collections::BTreeMap;

use chrono::{SubsecRound, Utc};
use rusqlite::params;
use tracing::{debug, instrument};

use yedek_core::{ConnectionInfo, EngineSpec, JobId};
use yedek_schedule::ScheduleKind;

use crate::db::{format_ts, parse_ts, SharedConn};
use crate::error::{Result, StoreError};
use crate::types::{Job, NewJob};

/// Thread-safe registry of backup job definitions.
///
/// Owns job lifetime exclusively: rows are created, edited, toggled and
/// deleted only through this type. Validation is syntactic — connectivity
/// problems surface later as failed execution records.
pub struct JobRegistry {
    db: SharedConn,
    engines: BTreeMap<String, EngineSpec>,
}

impl JobRegistry {
    /// Wrap an already-initialised connection. `engines` is the catalog
    /// consulted when validating definitions.
    pub fn new(db: SharedConn, engines: BTreeMap<String, EngineSpec>) -> Self {
        Self { db, engines }
    }

    #[instrument(skip(self, input), fields(name = %input.name, engine = %input.engine))]
    pub fn create(&self, input: &NewJob) -> Result<Job> {
        let schedule = self.validate(input)?;
        let id = JobId::new();
        let now = Utc::now().trunc_subsecs(3);

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO jobs
             (id, name, engine, host, port, username, password, db_name,
              schedule, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1, ?10, ?10)",
            params![
                id.as_str(),
                input.name,
                input.engine,
                input.connection.host,
                input.connection.port as i64,
                input.connection.username,
                input.connection.password,
                input.connection.database,
                schedule.to_string(),
                format_ts(&now),
            ],
        )?;
        debug!(job_id = %id, "job created");

        Ok(Job {
            id,
            name: input.name.clone(),
            engine: input.engine.clone(),
            connection: input.connection.clone(),
            schedule,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self), fields(job_id = %id))]
    pub fn get(&self, id: &JobId) -> Result<Job> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, name, engine, host, port, username, password, db_name,
                    schedule, active, created_at, updated_at
             FROM jobs WHERE id = ?1",
            params![id.as_str()],
            row_to_job,
        ) {
            Ok(job) => Ok(job),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(StoreError::JobNotFound {
                id: id.to_string(),
            }),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// All jobs in creation order.
    pub fn list(&self) -> Result<Vec<Job>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, name, engine, host, port, username, password, db_name,
                    schedule, active, created_at, updated_at
             FROM jobs
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([], row_to_job)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Jobs the scheduler should consider (active flag set).
    pub fn list_active(&self) -> Result<Vec<Job>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, name, engine, host, port, username, password, db_name,
                    schedule, active, created_at, updated_at
             FROM jobs
             WHERE active = 1
             ORDER BY created_at, rowid",
        )?;
        let rows = stmt.query_map([], row_to_job)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Replace every user-editable field of `id` with `input`.
    #[instrument(skip(self, input), fields(job_id = %id))]
    pub fn update(&self, id: &JobId, input: &NewJob) -> Result<Job> {
        let schedule = self.validate(input)?;
        let now = Utc::now().trunc_subsecs(3);
        {
            let db = self.db.lock().unwrap();
            let rows_changed = db.execute(
                "UPDATE jobs
                 SET name = ?1, engine = ?2, host = ?3, port = ?4,
                     username = ?5, password = ?6, db_name = ?7,
                     schedule = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    input.name,
                    input.engine,
                    input.connection.host,
                    input.connection.port as i64,
                    input.connection.username,
                    input.connection.password,
                    input.connection.database,
                    schedule.to_string(),
                    format_ts(&now),
                    id.as_str(),
                ],
            )?;
            if rows_changed == 0 {
                return Err(StoreError::JobNotFound { id: id.to_string() });
            }
        }
        self.get(id)
    }

    #[instrument(skip(self), fields(job_id = %id, active))]
    pub fn set_active(&self, id: &JobId, active: bool) -> Result<Job> {
        let now = Utc::now().trunc_subsecs(3);
        {
            let db = self.db.lock().unwrap();
            let rows_changed = db.execute(
                "UPDATE jobs SET active = ?1, updated_at = ?2 WHERE id = ?3",
                params![active as i64, format_ts(&now), id.as_str()],
            )?;
            if rows_changed == 0 {
                return Err(StoreError::JobNotFound { id: id.to_string() });
            }
        }
        self.get(id)
    }

    /// Delete a job. Its execution records go with it (ON DELETE CASCADE).
    #[instrument(skip(self), fields(job_id = %id))]
    pub fn delete(&self, id: &JobId) -> Result<()> {
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute("DELETE FROM jobs WHERE id = ?1", params![id.as_str()])?;
        if rows_changed == 0 {
            return Err(StoreError::JobNotFound { id: id.to_string() });
        }
        debug!(job_id = %id, "job deleted");
        Ok(())
    }

    fn validate(&self, input: &NewJob) -> Result<ScheduleKind> {
        if input.name.trim().is_empty() {
            return Err(StoreError::Validation(
                "job name must not be empty".to_string(),
            ));
        }
        match self.engines.get(&input.engine) {
            None => {
                return Err(StoreError::Validation(format!(
                    "unknown database engine '{}'",
                    input.engine
                )))
            }
            Some(spec) if spec.backup_command.is_none() => {
                return Err(StoreError::Validation(format!(
                    "engine '{}' does not support scheduled backups",
                    input.engine
                )))
            }
            Some(_) => {}
        }
        input.connection.validate().map_err(StoreError::Validation)?;
        Ok(ScheduleKind::parse(&input.schedule)?)
    }
}

/// Map a SQLite row to a `Job`.
fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let schedule_raw: String = row.get(8)?;
    let schedule = ScheduleKind::parse(&schedule_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Job {
        id: JobId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        engine: row.get(2)?,
        connection: ConnectionInfo {
            host: row.get(3)?,
            port: row.get::<_, i64>(4)? as u16,
            username: row.get(5)?,
            password: row.get(6)?,
            database: row.get(7)?,
        },
        schedule,
        active: row.get::<_, i64>(9)? != 0,
        created_at: parse_ts(10, row.get(10)?)?,
        updated_at: parse_ts(11, row.get(11)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::history::HistoryStore;
    use crate::types::NewRecord;
    use std::sync::{Arc, Mutex};
    use yedek_core::YedekConfig;

    fn shared_conn() -> SharedConn {
        Arc::new(Mutex::new(db::open_in_memory().unwrap()))
    }

    fn registry(db: SharedConn) -> JobRegistry {
        JobRegistry::new(db, YedekConfig::default().engines)
    }

    fn sample() -> NewJob {
        NewJob {
            name: "nightly orders".to_string(),
            engine: "PostgreSQL".to_string(),
            connection: ConnectionInfo {
                host: "db.internal".to_string(),
                port: 5432,
                username: "backup".to_string(),
                password: "s3cret".to_string(),
                database: "orders".to_string(),
            },
            schedule: "daily".to_string(),
        }
    }

    #[test]
    fn create_defaults_to_active() {
        let reg = registry(shared_conn());
        let job = reg.create(&sample()).unwrap();
        assert!(job.active);
        assert_eq!(job.schedule, ScheduleKind::Daily);

        let listed = reg.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, job.id);
        assert!(listed[0].active);
    }

    #[test]
    fn create_rejects_empty_host() {
        let reg = registry(shared_conn());
        let mut input = sample();
        input.connection.host = "".to_string();
        match reg.create(&input) {
            Err(StoreError::Validation(msg)) => assert!(msg.contains("host")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_unknown_engine() {
        let reg = registry(shared_conn());
        let mut input = sample();
        input.engine = "Redis".to_string();
        assert!(matches!(
            reg.create(&input),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn create_rejects_migration_only_engine() {
        let reg = registry(shared_conn());
        let mut input = sample();
        input.engine = "Oracle".to_string();
        match reg.create(&input) {
            Err(StoreError::Validation(msg)) => assert!(msg.contains("scheduled backups")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_rejects_malformed_schedule() {
        let reg = registry(shared_conn());
        let mut input = sample();
        input.schedule = "* * * *".to_string();
        assert!(matches!(reg.create(&input), Err(StoreError::Schedule(_))));
    }

    #[test]
    fn get_unknown_job_is_not_found() {
        let reg = registry(shared_conn());
        let missing = JobId::from("no-such-job");
        assert!(matches!(
            reg.get(&missing),
            Err(StoreError::JobNotFound { .. })
        ));
    }

    #[test]
    fn update_replaces_fields() {
        let reg = registry(shared_conn());
        let job = reg.create(&sample()).unwrap();

        let mut input = sample();
        input.name = "hourly orders".to_string();
        input.schedule = "hourly".to_string();
        let updated = reg.update(&job.id, &input).unwrap();

        assert_eq!(updated.name, "hourly orders");
        assert_eq!(updated.schedule, ScheduleKind::Hourly);
        assert_eq!(updated.created_at, job.created_at);
    }

    #[test]
    fn update_unknown_job_is_not_found() {
        let reg = registry(shared_conn());
        assert!(matches!(
            reg.update(&JobId::from("ghost"), &sample()),
            Err(StoreError::JobNotFound { .. })
        ));
    }

    #[test]
    fn toggle_twice_restores_original_state() {
        let reg = registry(shared_conn());
        let job = reg.create(&sample()).unwrap();

        let off = reg.set_active(&job.id, false).unwrap();
        assert!(!off.active);
        let on = reg.set_active(&job.id, true).unwrap();
        assert!(on.active);
        assert_eq!(on.active, job.active);
    }

    #[test]
    fn delete_removes_job() {
        let reg = registry(shared_conn());
        let job = reg.create(&sample()).unwrap();
        reg.delete(&job.id).unwrap();
        assert!(matches!(
            reg.get(&job.id),
            Err(StoreError::JobNotFound { .. })
        ));
        assert!(matches!(
            reg.delete(&job.id),
            Err(StoreError::JobNotFound { .. })
        ));
    }

    #[test]
    fn delete_cascades_execution_records() {
        let db = shared_conn();
        let reg = registry(db.clone());
        let history = HistoryStore::new(db);

        let job = reg.create(&sample()).unwrap();
        history
            .append(&NewRecord {
                job_id: job.id.clone(),
                started_at: Utc::now(),
                success: true,
                artifact_path: Some("/tmp/a.sql".to_string()),
                error_message: None,
            })
            .unwrap();
        assert_eq!(history.list_for(&job.id).unwrap().len(), 1);

        reg.delete(&job.id).unwrap();
        assert!(history.list_for(&job.id).unwrap().is_empty());
    }

    #[test]
    fn list_preserves_creation_order() {
        let reg = registry(shared_conn());
        let mut first = sample();
        first.name = "first".to_string();
        let mut second = sample();
        second.name = "second".to_string();

        reg.create(&first).unwrap();
        reg.create(&second).unwrap();

        let names: Vec<String> = reg.list().unwrap().into_iter().map(|j| j.name).collect();
        assert_eq!(names, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn list_active_skips_disabled_jobs() {
        let reg = registry(shared_conn());
        let keep = reg.create(&sample()).unwrap();
        let off = reg.create(&sample()).unwrap();
        reg.set_active(&off.id, false).unwrap();

        let active = reg.list_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);
    }
}
