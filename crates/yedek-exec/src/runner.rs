use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{ExecError, Result};
use crate::types::{ExecOptions, ExecOutput};

/// Seam between the planning layers and the operating system.
///
/// Implementations run one shell command to completion and capture its
/// output. Everything above this trait can be tested with a fake.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str, options: &ExecOptions) -> Result<ExecOutput>;
}

/// Runs commands via `sh -c`, enforcing the timeout and cancellation token.
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str, options: &ExecOptions) -> Result<ExecOutput> {
        // Command text routinely carries credentials — log size only.
        debug!(bytes = command.len(), "spawning shell command");

        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("spawn failed: {e}")))?;

        // `wait_with_output` takes `self` by value, so we drive it on a
        // spawned task and keep the PID for the kill paths.
        let pid = child.id();
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let _ = tx.send(child.wait_with_output().await);
        });

        // A fresh token never fires; it stands in for "no cancellation".
        let cancel = options.cancel.clone().unwrap_or_else(CancellationToken::new);

        let outcome = tokio::select! {
            res = rx => res,
            _ = tokio::time::sleep(options.timeout) => {
                kill_child(pid);
                return Err(ExecError::Timeout {
                    secs: options.timeout.as_secs(),
                });
            }
            _ = cancel.cancelled() => {
                kill_child(pid);
                return Err(ExecError::Cancelled);
            }
        };

        match outcome {
            Ok(Ok(output)) => Ok(ExecOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(e)) => Err(ExecError::Io(e)),
            // The oneshot sender was dropped — the wait task panicked.
            Err(_recv_err) => Err(ExecError::Spawn(
                "wait task panicked unexpectedly".to_string(),
            )),
        }
    }
}

/// SIGKILL the child by PID. Used on the timeout and cancellation paths,
/// where the `Child` handle has already been moved into the wait task.
fn kill_child(pid: Option<u32>) {
    if let Some(raw_pid) = pid {
        #[cfg(unix)]
        // Safety: raw_pid is our direct child, still running.
        unsafe {
            libc::kill(raw_pid as libc::pid_t, libc::SIGKILL);
        }
        #[cfg(not(unix))]
        {
            let _ = std::process::Command::new("taskkill")
                .args(["/F", "/PID", &raw_pid.to_string()])
                .output();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn opts(timeout_ms: u64) -> ExecOptions {
        ExecOptions::with_timeout(Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let out = ShellRunner.run("printf hello", &opts(5_000)).await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.success());
        assert_eq!(out.stdout, "hello");
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    async fn nonzero_exit_is_not_an_error() {
        let out = ShellRunner.run("exit 3", &opts(5_000)).await.unwrap();
        assert_eq!(out.exit_code, 3);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn captures_stderr() {
        let out = ShellRunner
            .run("echo oops 1>&2; exit 1", &opts(5_000))
            .await
            .unwrap();
        assert!(out.stderr.contains("oops"));
        assert!(out.stdout.is_empty());
    }

    #[tokio::test]
    async fn timeout_kills_long_running_child() {
        let started = Instant::now();
        let err = ShellRunner.run("sleep 30", &opts(100)).await.unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_aborts_the_run() {
        let token = CancellationToken::new();
        let mut options = opts(30_000);
        options.cancel = Some(token.clone());

        let aborter = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        let started = Instant::now();
        let err = ShellRunner.run("sleep 30", &options).await.unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        aborter.await.unwrap();
    }
}
