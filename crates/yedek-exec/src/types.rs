use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default time budget when the caller supplies none explicitly.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Captured outcome of one shell invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Process exit code (0 = success, -1 when killed by signal).
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout and stderr joined for display, stderr last.
    pub fn combined(&self) -> String {
        match (self.stdout.trim_end(), self.stderr.trim_end()) {
            ("", "") => String::new(),
            (out, "") => out.to_string(),
            ("", err) => err.to_string(),
            (out, err) => format!("{out}\n{err}"),
        }
    }
}

/// Knobs for one command run.
#[derive(Debug, Clone)]
pub struct ExecOptions {
    /// The child is killed once this budget is spent.
    pub timeout: Duration,
    /// Optional cooperative abort; firing it kills the child.
    pub cancel: Option<CancellationToken>,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cancel: None,
        }
    }
}

impl ExecOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            cancel: None,
        }
    }
}
