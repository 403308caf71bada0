use thiserror::Error;

/// All errors that can originate from command execution.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The child process could not be spawned.
    #[error("spawn error: {0}")]
    Spawn(String),

    /// Underlying I/O failure while waiting on the child.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The child exceeded its time budget and was killed.
    #[error("command timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The caller aborted the run via its cancellation token.
    #[error("command cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ExecError>;
