use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use yedek_core::template::{connection_vars, render};
use yedek_core::{EngineSpec, JobId};
use yedek_exec::{CommandRunner, ExecError, ExecOptions};
use yedek_store::{ExecutionRecord, HistoryStore, Job, JobRegistry, NewRecord};

use crate::error::Result;
use crate::slots::ExecutionSlots;

/// What caused an execution attempt. Both sources take the identical path
/// through [`JobExecutor::execute`]; the tag exists for logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Scheduled,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Scheduled => write!(f, "scheduled"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// Runs one backup attempt for a job and records the outcome.
///
/// Exactly one execution record is appended per attempt. A failing backup
/// tool is an outcome (success=false), not an error; the only `Err` paths
/// are an unknown job, a held execution slot, and storage faults.
pub struct JobExecutor {
    registry: Arc<JobRegistry>,
    history: Arc<HistoryStore>,
    slots: ExecutionSlots,
    runner: Arc<dyn CommandRunner>,
    engines: BTreeMap<String, EngineSpec>,
    backup_dir: String,
    timeout: Duration,
}

impl JobExecutor {
    pub fn new(
        registry: Arc<JobRegistry>,
        history: Arc<HistoryStore>,
        runner: Arc<dyn CommandRunner>,
        engines: BTreeMap<String, EngineSpec>,
        backup_dir: String,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            history,
            slots: ExecutionSlots::new(),
            runner,
            engines,
            backup_dir,
            timeout,
        }
    }

    pub fn is_running(&self, id: &JobId) -> bool {
        self.slots.is_running(id)
    }

    /// Run one backup attempt for `id`.
    ///
    /// Acquires the job's execution slot first; a held slot yields
    /// `AlreadyRunning` without touching anything else. The slot guard is
    /// dropped on every return path, so the job can never stay stuck in
    /// Running.
    pub async fn execute(&self, id: &JobId, trigger: Trigger) -> Result<ExecutionRecord> {
        let job = self.registry.get(id)?;
        let _guard = self.slots.acquire(id)?;

        let started_at = Utc::now();
        info!(job_id = %id, %trigger, engine = %job.engine, "backup attempt started");

        let (success, artifact_path, error_message) = self.run_backup(&job).await;
        if success {
            info!(job_id = %id, "backup attempt succeeded");
        } else {
            warn!(
                job_id = %id,
                error = error_message.as_deref().unwrap_or("unknown"),
                "backup attempt failed"
            );
        }

        let record = self.history.append(&NewRecord {
            job_id: id.clone(),
            started_at,
            success,
            artifact_path,
            error_message,
        })?;
        Ok(record)
    }

    /// Resolve the template, invoke the tool, classify the outcome.
    /// Every failure mode lands in the returned error message.
    async fn run_backup(&self, job: &Job) -> (bool, Option<String>, Option<String>) {
        let spec = match self.engines.get(&job.engine) {
            Some(spec) => spec,
            None => {
                return (
                    false,
                    None,
                    Some(format!("engine '{}' is missing from the catalog", job.engine)),
                )
            }
        };
        let template = match &spec.backup_command {
            Some(t) => t,
            None => {
                return (
                    false,
                    None,
                    Some(format!("engine '{}' has no backup command template", job.engine)),
                )
            }
        };

        let output_path = self.artifact_path(job, &spec.artifact_ext);
        if let Some(parent) = Path::new(&output_path).parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return (
                    false,
                    None,
                    Some(format!("cannot create backup directory: {e}")),
                );
            }
        }

        let mut vars = connection_vars("", &job.connection);
        vars.push(("output".to_string(), output_path.clone()));
        let command = render(template, &vars);

        match self
            .runner
            .run(&command, &ExecOptions::with_timeout(self.timeout))
            .await
        {
            Ok(out) if out.success() => (true, Some(output_path), None),
            Ok(out) => {
                let detail = out.combined();
                let message = if detail.is_empty() {
                    format!("backup tool exited with code {}", out.exit_code)
                } else {
                    format!("backup tool exited with code {}: {detail}", out.exit_code)
                };
                (false, None, Some(message))
            }
            Err(ExecError::Timeout { secs }) => {
                (false, None, Some(format!("backup timed out after {secs}s")))
            }
            Err(e) => (false, None, Some(e.to_string())),
        }
    }

    /// `<backup_dir>/<job-id>/<UTC timestamp>.<ext>`
    fn artifact_path(&self, job: &Job, ext: &str) -> String {
        let stamp = Utc::now().format("%Y%m%d-%H%M%S");
        format!("{}/{}/{stamp}.{ext}", self.backup_dir, job.id)
    }
}
