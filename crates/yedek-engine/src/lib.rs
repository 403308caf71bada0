//! `yedek-engine` — backup execution and the scheduler loop.
//!
//! [`JobExecutor`] runs one backup attempt per trigger, guarded by the
//! per-job [`ExecutionSlots`] map so scheduled and manual triggers can never
//! overlap for the same job. [`SchedulerLoop`] ticks at a fixed interval,
//! finds due jobs, and spawns one task per execution.

pub mod error;
pub mod executor;
pub mod scheduler;
pub mod slots;

pub use error::{EngineError, Result};
pub use executor::{JobExecutor, Trigger};
pub use scheduler::SchedulerLoop;
pub use slots::{ExecutionSlots, SlotGuard};
