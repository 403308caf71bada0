//! `yedek-exec` — shell command execution with timeout and cancellation.
//!
//! Both the backup engine and the migration planner drive external tools
//! (mysqldump, pg_dump, pgloader, ...) through the [`runner::CommandRunner`]
//! trait. Production code uses [`runner::ShellRunner`]; tests substitute
//! in-memory fakes.

pub mod error;
pub mod runner;
pub mod types;

pub use error::{ExecError, Result};
pub use runner::{CommandRunner, ShellRunner};
pub use types::{ExecOptions, ExecOutput};
