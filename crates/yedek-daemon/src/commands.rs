use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use yedek_core::{ConnectionInfo, JobId, RecordId, YedekConfig};
use yedek_engine::{JobExecutor, SchedulerLoop, Trigger};
use yedek_exec::ShellRunner;
use yedek_migrate::{Endpoint, MigrationPlanner, MigrationRequest, PlanMode};
use yedek_schedule::next_run_after;
use yedek_store::{db, HistoryStore, Job, JobRegistry, NewJob, SharedConn};

use crate::cli::{HistoryCommand, JobCommand, JobSpecArgs, MigrateArgs};

/// Everything a command handler needs, wired once from config.
pub struct App {
    pub config: YedekConfig,
    pub registry: Arc<JobRegistry>,
    pub history: Arc<HistoryStore>,
    pub executor: Arc<JobExecutor>,
    pub planner: MigrationPlanner,
}

impl App {
    pub fn build(config: YedekConfig) -> anyhow::Result<Self> {
        let db_path = &config.database.path;
        if let Some(parent) = std::path::Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!(path = %db_path, "opening SQLite database");
        let conn = db::open(db_path)?;
        db::init_db(&conn)?;
        let shared: SharedConn = Arc::new(Mutex::new(conn));

        let registry = Arc::new(JobRegistry::new(shared.clone(), config.engines.clone()));
        let history = Arc::new(HistoryStore::new(shared));
        let runner = Arc::new(ShellRunner);
        let executor = Arc::new(JobExecutor::new(
            Arc::clone(&registry),
            Arc::clone(&history),
            runner.clone(),
            config.engines.clone(),
            config.backup.dir.clone(),
            Duration::from_secs(config.backup.timeout_secs),
        ));
        let planner = MigrationPlanner::new(config.migration.clone(), runner);

        Ok(Self {
            config,
            registry,
            history,
            executor,
            planner,
        })
    }

    /// `yedekd run` — the scheduler loop until ctrl-c.
    pub async fn run_daemon(&self) -> anyhow::Result<()> {
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let scheduler = SchedulerLoop::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.history),
            Arc::clone(&self.executor),
            Duration::from_secs(self.config.scheduler.tick_secs),
        );
        let loop_handle = tokio::spawn(scheduler.run(shutdown_rx));

        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
        loop_handle.await?;
        Ok(())
    }

    pub fn engines(&self) {
        for name in self.config.engine_names() {
            let spec = &self.config.engines[name];
            let port = spec
                .default_port
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string());
            let backup = if spec.backup_command.is_some() {
                "backup"
            } else {
                "migration-only"
            };
            let targets = self.planner.targets_for(name);
            let targets = if targets.is_empty() {
                "-".to_string()
            } else {
                targets.join(", ")
            };
            println!("{name:<14} port {port:<6} {backup:<15} -> {targets}");
        }
    }

    pub async fn job(&self, cmd: JobCommand) -> anyhow::Result<()> {
        match cmd {
            JobCommand::Add(spec) => {
                let job = self.registry.create(&self.new_job(spec)?)?;
                println!("created job {}", job.id);
                print_job(&job);
            }
            JobCommand::Show { id, json } => {
                let job = self.registry.get(&JobId::from(id))?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&job)?);
                } else {
                    print_job(&job);
                }
            }
            JobCommand::Update { id, spec } => {
                let job = self.registry.update(&JobId::from(id), &self.new_job(spec)?)?;
                println!("updated job {}", job.id);
                print_job(&job);
            }
            JobCommand::Rm { id } => {
                let id = JobId::from(id);
                self.registry.delete(&id)?;
                println!("deleted job {id} and its history");
            }
            JobCommand::List { json } => {
                let jobs = self.registry.list()?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&jobs)?);
                } else if jobs.is_empty() {
                    println!("no jobs registered");
                } else {
                    for job in jobs {
                        let flag = if job.active { "active" } else { "inactive" };
                        println!(
                            "{}  {:<24} {:<12} {:<10} {}",
                            job.id, job.name, job.engine, job.schedule, flag
                        );
                    }
                }
            }
            JobCommand::Toggle { id } => {
                let id = JobId::from(id);
                let job = self.registry.get(&id)?;
                let job = self.registry.set_active(&id, !job.active)?;
                println!(
                    "job {} is now {}",
                    job.id,
                    if job.active { "active" } else { "inactive" }
                );
            }
            JobCommand::Run { id } => {
                let record = self
                    .executor
                    .execute(&JobId::from(id), Trigger::Manual)
                    .await?;
                if record.success {
                    println!(
                        "backup succeeded, artifact: {}",
                        record.artifact_path.as_deref().unwrap_or("-")
                    );
                } else {
                    println!(
                        "backup failed: {}",
                        record.error_message.as_deref().unwrap_or("unknown error")
                    );
                }
                println!("record id: {}", record.id);
            }
        }
        Ok(())
    }

    pub fn history(&self, cmd: HistoryCommand) -> anyhow::Result<()> {
        match cmd {
            HistoryCommand::List { job_id, json } => {
                let records = self.history.list_for(&JobId::from(job_id))?;
                if json {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                } else if records.is_empty() {
                    println!("no executions recorded");
                } else {
                    for r in records {
                        let outcome = if r.success { "ok  " } else { "fail" };
                        let detail = r
                            .artifact_path
                            .or(r.error_message)
                            .unwrap_or_else(|| "-".to_string());
                        println!("{}  {}  {}  {}", r.id, r.started_at, outcome, detail);
                    }
                }
            }
            HistoryCommand::Fetch { record_id, out } => {
                let bytes = self.history.artifact_bytes(&RecordId::from(record_id))?;
                match out {
                    Some(path) => {
                        std::fs::write(&path, &bytes)?;
                        println!("wrote {} bytes to {path}", bytes.len());
                    }
                    None => std::io::stdout().write_all(&bytes)?,
                }
            }
        }
        Ok(())
    }

    pub async fn migrate(&self, args: MigrateArgs) -> anyhow::Result<()> {
        let request = MigrationRequest {
            source: Endpoint {
                engine: args.source_engine.clone(),
                connection: ConnectionInfo {
                    host: args.source_host,
                    port: self.resolve_port(&args.source_engine, args.source_port)?,
                    username: args.source_username,
                    password: args.source_password,
                    database: args.source_database,
                },
            },
            target: Endpoint {
                engine: args.target_engine.clone(),
                connection: ConnectionInfo {
                    host: args.target_host,
                    port: self.resolve_port(&args.target_engine, args.target_port)?,
                    username: args.target_username,
                    password: args.target_password,
                    database: args.target_database,
                },
            },
        };
        let mode = if args.execute {
            PlanMode::Execute
        } else {
            PlanMode::Preview
        };

        let plan = self.planner.plan(&request, mode, None).await?;
        println!("strategy: {}", plan.info);
        println!("command:  {}", plan.command);
        match (plan.succeeded, plan.output) {
            (Some(true), Some(output)) => {
                println!("migration succeeded");
                if !output.is_empty() {
                    println!("{output}");
                }
            }
            (Some(false), Some(output)) => println!("migration failed: {output}"),
            _ => println!("(preview only — pass --execute to run)"),
        }
        Ok(())
    }

    fn new_job(&self, spec: JobSpecArgs) -> anyhow::Result<NewJob> {
        let port = self.resolve_port(&spec.engine, spec.port)?;
        Ok(NewJob {
            name: spec.name,
            engine: spec.engine,
            connection: ConnectionInfo {
                host: spec.host,
                port,
                username: spec.username,
                password: spec.password,
                database: spec.database,
            },
            schedule: spec.schedule,
        })
    }

    fn resolve_port(&self, engine: &str, port: Option<u16>) -> anyhow::Result<u16> {
        if let Some(p) = port {
            return Ok(p);
        }
        self.config
            .engine(engine)
            .and_then(|s| s.default_port)
            .ok_or_else(|| anyhow::anyhow!("engine '{engine}' has no default port, pass --port"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::JobCommand;

    fn test_app() -> (App, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = YedekConfig::default();
        config.database.path = dir.path().join("yedek.db").display().to_string();
        config.backup.dir = dir.path().join("backups").display().to_string();
        let app = App::build(config).unwrap();
        (app, dir)
    }

    #[tokio::test]
    async fn job_run_on_unknown_id_is_an_error() {
        let (app, _dir) = test_app();
        let err = app
            .job(JobCommand::Run {
                id: "ghost".to_string(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn resolve_port_falls_back_to_catalog() {
        let (app, _dir) = test_app();
        assert_eq!(app.resolve_port("MySQL", Some(13306)).unwrap(), 13306);
        assert_eq!(app.resolve_port("MySQL", None).unwrap(), 3306);
        // SQLite has no catalog port, so it must be given explicitly.
        assert!(app.resolve_port("SQLite", None).is_err());
    }
}

fn print_job(job: &Job) {
    println!("name:     {}", job.name);
    println!("engine:   {}", job.engine);
    println!(
        "target:   {}@{}:{}/{}",
        job.connection.username, job.connection.host, job.connection.port, job.connection.database
    );
    println!("schedule: {}", job.schedule);
    println!("active:   {}", job.active);
    match next_run_after(&job.schedule, Utc::now()) {
        Some(next) => println!("next run: {next}"),
        None => println!("next run: manual trigger only"),
    }
}
