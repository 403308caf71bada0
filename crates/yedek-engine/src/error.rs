use thiserror::Error;

use yedek_store::StoreError;

/// All errors that can originate from the execution engine.
///
/// A failing backup command is deliberately *not* represented here: the
/// failure is captured in the job's execution record instead.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The job's execution slot is still held by a previous run.
    #[error("job {id} is already running")]
    AlreadyRunning { id: String },

    /// Registry or history access failed.
    #[error("{0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
