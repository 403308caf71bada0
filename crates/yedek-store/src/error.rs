use thiserror::Error;

/// Errors that can occur in registry and history operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested job does not exist.
    #[error("job not found: {id}")]
    JobNotFound { id: String },

    /// The requested execution record does not exist.
    #[error("execution record not found: {id}")]
    RecordNotFound { id: String },

    /// The record exists but carries no retrievable artifact (failed run,
    /// no stored path, or the file is gone from disk).
    #[error("no artifact available for record {id}")]
    ArtifactNotFound { id: String },

    /// Input rejected by syntactic validation; the message is caller-facing.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The schedule string did not parse (bad keyword or cron expression).
    #[error("{0}")]
    Schedule(#[from] yedek_schedule::ScheduleError),

    /// A SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Artifact file I/O failed for a reason other than absence.
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
