use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use yedek_core::{ConnectionInfo, JobId, RecordId};
use yedek_schedule::ScheduleKind;

/// A persisted backup job definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    /// Human-readable label.
    pub name: String,
    /// Engine catalog key, e.g. "MySQL".
    pub engine: String,
    pub connection: ConnectionInfo,
    pub schedule: ScheduleKind,
    /// Inactive jobs are skipped by the scheduler but still run on manual
    /// trigger.
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for `create` and `update`. The schedule arrives as the raw user
/// string and is parsed during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub name: String,
    pub engine: String,
    pub connection: ConnectionInfo,
    pub schedule: String,
}

/// Immutable outcome of one backup attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: RecordId,
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    pub success: bool,
    pub artifact_path: Option<String>,
    pub error_message: Option<String>,
}

/// Record data as produced by the execution engine, before an id is
/// assigned.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub job_id: JobId,
    pub started_at: DateTime<Utc>,
    pub success: bool,
    pub artifact_path: Option<String>,
    pub error_message: Option<String>,
}
