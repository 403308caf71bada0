//! Per-job execution slots.
//!
//! Each job owns exactly one slot. Whoever holds the [`SlotGuard`] is the
//! running attempt; everyone else gets `AlreadyRunning` until the guard is
//! dropped. Scheduled and manual triggers both go through [`ExecutionSlots`],
//! so the two can never overlap for the same job.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use yedek_core::JobId;

use crate::error::{EngineError, Result};

/// Concurrent map of jobs that are currently mid-run.
#[derive(Clone, Default)]
pub struct ExecutionSlots {
    inner: Arc<DashMap<JobId, ()>>,
}

impl ExecutionSlots {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Claim the slot for `id`.
    ///
    /// The entry API makes check-and-insert a single atomic step, so two
    /// racing triggers can never both succeed.
    pub fn acquire(&self, id: &JobId) -> Result<SlotGuard> {
        match self.inner.entry(id.clone()) {
            Entry::Occupied(_) => Err(EngineError::AlreadyRunning { id: id.to_string() }),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(SlotGuard {
                    slots: Arc::clone(&self.inner),
                    id: id.clone(),
                })
            }
        }
    }

    pub fn is_running(&self, id: &JobId) -> bool {
        self.inner.contains_key(id)
    }

    pub fn running_count(&self) -> usize {
        self.inner.len()
    }
}

/// Held for the duration of one run; dropping it frees the job's slot.
///
/// Tying release to `Drop` means the slot is returned on every exit path,
/// including failed runs.
pub struct SlotGuard {
    slots: Arc<DashMap<JobId, ()>>,
    id: JobId,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.slots.remove(&self.id);
    }
}
