//! `yedek-schedule` — schedule parsing and next-run computation.
//!
//! # Overview
//!
//! A job's schedule is entered as a single string and normalised once, at
//! parse time, into a [`types::ScheduleKind`]. Everything downstream works
//! with the parsed form; malformed input never reaches the scheduler.
//!
//! # Variants
//!
//! | Input                  | Behaviour                                     |
//! |------------------------|-----------------------------------------------|
//! | `manual`               | Never due; runs only on explicit trigger      |
//! | `hourly`               | Top of every hour (UTC)                       |
//! | `daily`                | Every day at 00:00 UTC                        |
//! | `weekly`               | Every Monday at 00:00 UTC                     |
//! | 5-field cron           | Standard minute/hour/dom/month/dow semantics  |
//!
//! `next_run_after` is pure and deterministic: anchors are fixed clock
//! boundaries, so repeated evaluation with the same reference time yields
//! the same answer.

pub mod cron;
pub mod error;
pub mod next_run;
pub mod types;

pub use cron::CronExpr;
pub use error::{Result, ScheduleError};
pub use next_run::next_run_after;
pub use types::ScheduleKind;
