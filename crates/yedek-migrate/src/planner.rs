use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use yedek_core::template::{connection_vars, render};
use yedek_core::MigrationConfig;
use yedek_exec::{CommandRunner, ExecError, ExecOptions};

use crate::error::{MigrateError, Result};
use crate::types::{Endpoint, MigrationPlan, MigrationRequest, PlanMode};

/// Plans and optionally executes cross-engine migrations.
///
/// All engine-pair knowledge lives in the [`MigrationConfig`] handed in at
/// construction; the planner only validates, looks up, renders, and runs.
pub struct MigrationPlanner {
    config: MigrationConfig,
    runner: Arc<dyn CommandRunner>,
}

impl MigrationPlanner {
    pub fn new(config: MigrationConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Source engines with at least one supported target.
    pub fn sources(&self) -> Vec<String> {
        self.config.sources()
    }

    /// Supported targets for `source`, in configured order.
    pub fn targets_for(&self, source: &str) -> Vec<String> {
        self.config.targets_for(source)
    }

    /// Build the plan for `request`; in [`PlanMode::Execute`] also run it.
    ///
    /// Tool failure and timeout in execute mode are captured into the plan
    /// (`succeeded = false`, `output` holds the diagnostic). Cancellation
    /// via `cancel` is the one execute-time outcome raised as an error.
    pub async fn plan(
        &self,
        request: &MigrationRequest,
        mode: PlanMode,
        cancel: Option<CancellationToken>,
    ) -> Result<MigrationPlan> {
        validate_endpoint("source", &request.source)?;
        validate_endpoint("target", &request.target)?;

        let pair = self
            .config
            .pair(&request.source.engine, &request.target.engine)
            .ok_or_else(|| MigrateError::Unsupported {
                source: request.source.engine.clone(),
                target: request.target.engine.clone(),
            })?;

        let mut vars = connection_vars("src_", &request.source.connection);
        vars.extend(connection_vars("dst_", &request.target.connection));
        let command = render(&pair.command, &vars);
        let info = render(&pair.info, &vars);

        let mut plan = MigrationPlan {
            command,
            info,
            output: None,
            succeeded: None,
        };
        if mode == PlanMode::Preview {
            return Ok(plan);
        }

        info!(
            source = %request.source.engine,
            target = %request.target.engine,
            "executing migration"
        );
        let options = ExecOptions {
            timeout: Duration::from_secs(self.config.timeout_secs),
            cancel,
        };
        match self.runner.run(&plan.command, &options).await {
            Ok(out) => {
                if !out.success() {
                    warn!(exit_code = out.exit_code, "migration tool failed");
                }
                plan.succeeded = Some(out.success());
                plan.output = Some(if out.success() {
                    out.combined()
                } else {
                    let detail = out.combined();
                    if detail.is_empty() {
                        format!("migration tool exited with code {}", out.exit_code)
                    } else {
                        format!(
                            "migration tool exited with code {}: {detail}",
                            out.exit_code
                        )
                    }
                });
                Ok(plan)
            }
            Err(ExecError::Cancelled) => Err(MigrateError::Cancelled),
            Err(ExecError::Timeout { secs }) => {
                warn!(secs, "migration timed out");
                plan.succeeded = Some(false);
                plan.output = Some(format!("migration timed out after {secs}s"));
                Ok(plan)
            }
            Err(e) => {
                plan.succeeded = Some(false);
                plan.output = Some(e.to_string());
                Ok(plan)
            }
        }
    }
}

fn validate_endpoint(label: &str, endpoint: &Endpoint) -> Result<()> {
    if endpoint.engine.trim().is_empty() {
        return Err(MigrateError::Validation(format!(
            "{label} engine must not be empty"
        )));
    }
    endpoint
        .connection
        .validate()
        .map_err(|reason| MigrateError::Validation(format!("{label}: {reason}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use yedek_core::{ConnectionInfo, YedekConfig};
    use yedek_exec::ExecOutput;

    struct FakeRunner {
        exit_code: i32,
        stdout: String,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        fn with(exit_code: i32, stdout: &str) -> Arc<Self> {
            Arc::new(Self {
                exit_code,
                stdout: stdout.to_string(),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CommandRunner for FakeRunner {
        async fn run(
            &self,
            command: &str,
            _options: &ExecOptions,
        ) -> yedek_exec::Result<ExecOutput> {
            self.calls.lock().unwrap().push(command.to_string());
            Ok(ExecOutput {
                exit_code: self.exit_code,
                stdout: self.stdout.clone(),
                stderr: String::new(),
            })
        }
    }

    struct CancelledRunner;

    #[async_trait]
    impl CommandRunner for CancelledRunner {
        async fn run(
            &self,
            _command: &str,
            _options: &ExecOptions,
        ) -> yedek_exec::Result<ExecOutput> {
            Err(ExecError::Cancelled)
        }
    }

    struct TimeoutRunner;

    #[async_trait]
    impl CommandRunner for TimeoutRunner {
        async fn run(
            &self,
            _command: &str,
            options: &ExecOptions,
        ) -> yedek_exec::Result<ExecOutput> {
            Err(ExecError::Timeout {
                secs: options.timeout.as_secs(),
            })
        }
    }

    fn endpoint(engine: &str, port: u16, database: &str) -> Endpoint {
        Endpoint {
            engine: engine.to_string(),
            connection: ConnectionInfo {
                host: "db.internal".to_string(),
                port,
                username: "admin".to_string(),
                password: "pw".to_string(),
                database: database.to_string(),
            },
        }
    }

    fn request(source: &str, target: &str) -> MigrationRequest {
        MigrationRequest {
            source: endpoint(source, 3306, "src_db"),
            target: endpoint(target, 5432, "dst_db"),
        }
    }

    fn planner(runner: Arc<dyn CommandRunner>) -> MigrationPlanner {
        MigrationPlanner::new(YedekConfig::default().migration, runner)
    }

    #[tokio::test]
    async fn mysql_to_mariadb_previews_nonempty_command() {
        let runner = FakeRunner::with(0, "");
        let plan = planner(runner.clone())
            .plan(&request("MySQL", "MariaDB"), PlanMode::Preview, None)
            .await
            .unwrap();

        assert!(!plan.command.is_empty());
        assert!(plan.command.contains("mysqldump"));
        assert!(plan.command.contains("db.internal"));
        assert!(!plan.command.contains("{src_"));
        assert!(!plan.info.is_empty());
        assert!(plan.output.is_none());
        assert!(plan.succeeded.is_none());
        // Preview must never touch the runner.
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn mariadb_to_oracle_is_unsupported() {
        let err = planner(FakeRunner::with(0, ""))
            .plan(&request("MariaDB", "Oracle"), PlanMode::Preview, None)
            .await
            .unwrap_err();
        match err {
            MigrateError::Unsupported { source, target } => {
                assert_eq!(source, "MariaDB");
                assert_eq!(target, "Oracle");
            }
            other => panic!("expected Unsupported, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_endpoint_field_fails_validation() {
        let mut req = request("MySQL", "PostgreSQL");
        req.target.connection.host = String::new();
        let err = planner(FakeRunner::with(0, ""))
            .plan(&req, PlanMode::Preview, None)
            .await
            .unwrap_err();
        match err {
            MigrateError::Validation(msg) => {
                assert!(msg.contains("target"));
                assert!(msg.contains("host"));
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_mode_captures_tool_output() {
        let runner = FakeRunner::with(0, "LOAD completed, 42 rows\n");
        let plan = planner(runner.clone())
            .plan(&request("MySQL", "PostgreSQL"), PlanMode::Execute, None)
            .await
            .unwrap();

        assert_eq!(plan.succeeded, Some(true));
        assert!(plan.output.unwrap().contains("42 rows"));
        assert_eq!(runner.call_count(), 1);
    }

    #[tokio::test]
    async fn execute_mode_captures_tool_failure() {
        let plan = planner(FakeRunner::with(2, ""))
            .plan(&request("MySQL", "PostgreSQL"), PlanMode::Execute, None)
            .await
            .unwrap();

        assert_eq!(plan.succeeded, Some(false));
        assert!(plan.output.unwrap().contains("exited with code 2"));
    }

    #[tokio::test]
    async fn execute_mode_captures_timeout() {
        let plan = planner(Arc::new(TimeoutRunner))
            .plan(&request("MySQL", "PostgreSQL"), PlanMode::Execute, None)
            .await
            .unwrap();

        assert_eq!(plan.succeeded, Some(false));
        assert!(plan.output.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn cancellation_is_raised_not_captured() {
        let token = CancellationToken::new();
        token.cancel();
        let err = planner(Arc::new(CancelledRunner))
            .plan(
                &request("MySQL", "PostgreSQL"),
                PlanMode::Execute,
                Some(token),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MigrateError::Cancelled));
    }

    #[tokio::test]
    async fn matrix_listing_matches_config() {
        let p = planner(FakeRunner::with(0, ""));
        assert!(p.sources().contains(&"Oracle".to_string()));
        assert_eq!(
            p.targets_for("MySQL"),
            vec!["PostgreSQL".to_string(), "MariaDB".to_string()]
        );
        assert!(p.targets_for("Redis").is_empty());
    }
}
