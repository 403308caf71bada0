//! `yedek-store` — SQLite persistence for job definitions and execution
//! history. The registry owns job lifetime; the history store owns record
//! lifetime; the two meet only at the job-id foreign key (records are
//! removed with their job via cascade).

pub mod db;
pub mod error;
pub mod history;
pub mod registry;
pub mod types;

pub use db::SharedConn;
pub use error::{Result, StoreError};
pub use history::HistoryStore;
pub use registry::JobRegistry;
pub use types::{ExecutionRecord, Job, NewJob, NewRecord};
