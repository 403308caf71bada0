use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid schedule '{input}': {reason}")]
    InvalidSchedule { input: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
