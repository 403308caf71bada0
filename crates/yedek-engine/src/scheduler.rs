use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use yedek_schedule::next_run_after;
use yedek_store::{HistoryStore, Job, JobRegistry};

use crate::error::{EngineError, Result};
use crate::executor::{JobExecutor, Trigger};

/// The scheduler tick loop.
///
/// Every tick scans the registry for due jobs and hands each one to its own
/// task; the tick itself never waits for an execution to finish, so one slow
/// backup cannot delay due-ness evaluation for the rest.
pub struct SchedulerLoop {
    registry: Arc<JobRegistry>,
    history: Arc<HistoryStore>,
    executor: Arc<JobExecutor>,
    tick: Duration,
}

impl SchedulerLoop {
    pub fn new(
        registry: Arc<JobRegistry>,
        history: Arc<HistoryStore>,
        executor: Arc<JobExecutor>,
        tick: Duration,
    ) -> Self {
        Self {
            registry,
            history,
            executor,
            tick,
        }
    }

    /// Run until `shutdown` broadcasts `true`. A failed sweep is logged and
    /// the loop carries on; nothing in here can terminate it early.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_secs = self.tick.as_secs(), "scheduler loop started");
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.due_jobs(Utc::now()) {
                        Ok(due) => {
                            for job in due {
                                self.dispatch(job);
                            }
                        }
                        Err(e) => warn!(error = %e, "due-job sweep failed"),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler loop stopped");
                        break;
                    }
                }
            }
        }
    }

    /// Active, non-manual jobs whose next run after their last attempt (or
    /// creation, for jobs that never ran) is at or before `now`.
    pub fn due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<Job>> {
        let mut due = Vec::new();
        for job in self.registry.list_active()? {
            if job.schedule.is_manual() {
                continue;
            }
            let anchor = self
                .history
                .last_started_at(&job.id)?
                .unwrap_or(job.created_at);
            match next_run_after(&job.schedule, anchor) {
                Some(next) if next <= now => due.push(job),
                _ => {}
            }
        }
        Ok(due)
    }

    fn dispatch(&self, job: Job) {
        let executor = Arc::clone(&self.executor);
        tokio::spawn(async move {
            match executor.execute(&job.id, Trigger::Scheduled).await {
                Ok(record) => {
                    debug!(job_id = %job.id, success = record.success, "scheduled run recorded")
                }
                // Expected overlap: the previous attempt is still in flight.
                Err(EngineError::AlreadyRunning { .. }) => {
                    debug!(job_id = %job.id, "previous run still in flight, skipping")
                }
                Err(e) => warn!(job_id = %job.id, error = %e, "scheduled run failed"),
            }
        });
    }
}
