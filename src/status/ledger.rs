// src/status/ledger.rs

use std::collections::HashMap;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::status::ExecutionStatus;
use crate::types::StatusId;

/// How long a finished execution stays queryable.
pub const RETENTION: TimeDelta = TimeDelta::hours(1);

#[derive(Debug, Default)]
struct LedgerState {
    last_id: StatusId,
    entries: HashMap<StatusId, ExecutionStatus>,
}

/// Map of status id to execution result.
///
/// Counter and map share one lock; every method holds it only for the
/// counter/map access itself.
#[derive(Debug)]
pub struct StatusLedger {
    state: Mutex<LedgerState>,
    retention: TimeDelta,
}

impl Default for StatusLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLedger {
    pub fn new() -> Self {
        Self::with_retention(RETENTION)
    }

    pub fn with_retention(retention: TimeDelta) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            retention,
        }
    }

    /// Reserve the next identifier. Starts at 1 and never repeats.
    pub fn allocate(&self) -> StatusId {
        let mut state = self.state.lock();
        state.last_id += 1;
        state.last_id
    }

    pub fn record(&self, id: StatusId, status: ExecutionStatus) {
        self.state.lock().entries.insert(id, status);
    }

    /// Recorded status for `id`. Ids still running, expired, or never
    /// allocated all read as `None`.
    pub fn get(&self, id: StatusId) -> Option<ExecutionStatus> {
        self.state.lock().entries.get(&id).cloned()
    }

    /// Drop every entry that finished before `now - retention`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let mut state = self.state.lock();
        let before = state.entries.len();
        state.entries.retain(|_, status| status.finished_at >= cutoff);
        let removed = before - state.entries.len();
        if removed > 0 {
            debug!(removed, remaining = state.entries.len(), "swept expired statuses");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
