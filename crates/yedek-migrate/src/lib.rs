//! `yedek-migrate` — cross-engine migration planning and execution.
//!
//! The [`MigrationPlanner`] checks a source/target pair against the
//! compatibility matrix, renders the pair's command and info templates, and
//! either returns the plan as a preview or runs it through the shared
//! [`yedek_exec::CommandRunner`] seam with timeout and cancellation.

pub mod error;
pub mod planner;
pub mod types;

pub use error::{MigrateError, Result};
pub use planner::MigrationPlanner;
pub use types::{Endpoint, MigrationPlan, MigrationRequest, PlanMode};
