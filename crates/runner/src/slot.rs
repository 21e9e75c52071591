//! The single job slot and its compare-and-transition state machine.
//!
//! Every state change goes through [`JobSlot::transition`], which only moves
//! the slot when its current state is one the caller expects. The current
//! state is mirrored into a `watch` channel so readers never need the lock.

use std::sync::Arc;

use fuzzdeck_core::job_state::JobState;
use fuzzdeck_core::types::{JobId, Timestamp};
use serde::Serialize;
use tokio::sync::{watch, Notify};

/// Bookkeeping for the job that occupies (or last occupied) the slot.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: JobId,
    pub command: String,
    pub pid: Option<u32>,
    pub started_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    /// Wakes the supervisor when a stop is requested.
    pub(crate) stop_signal: Arc<Notify>,
}

/// Read-only view of the slot for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub state: JobState,
    pub job_id: Option<JobId>,
    pub command: Option<String>,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}

/// Is `from -> to` a legal edge of the lifecycle graph?
pub fn is_legal(from: JobState, to: JobState) -> bool {
    use JobState::*;
    matches!(
        (from, to),
        (Idle | Finished | Error, Starting)
            | (Starting, Running | Error)
            | (Running, Stopping | Finished | Error)
            | (Stopping, Finished | Error)
    )
}

#[derive(Debug)]
pub struct JobSlot {
    state: JobState,
    /// Job that claimed the slot, known from `Starting` on.
    current_job: Option<JobId>,
    record: Option<JobRecord>,
    state_tx: watch::Sender<JobState>,
}

impl JobSlot {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(JobState::Idle);
        Self {
            state: JobState::Idle,
            current_job: None,
            record: None,
            state_tx,
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Receiver that always holds the current state.
    pub fn watch(&self) -> watch::Receiver<JobState> {
        self.state_tx.subscribe()
    }

    /// Move to `to` if the current state is in `expected`.
    ///
    /// Returns the previous state, or the current state unchanged when the
    /// slot is not in an expected state or the edge is not legal.
    pub fn transition(&mut self, expected: &[JobState], to: JobState) -> Result<JobState, JobState> {
        let from = self.state;
        if !expected.contains(&from) || !is_legal(from, to) {
            return Err(from);
        }
        self.state = to;
        self.state_tx.send_replace(to);
        tracing::debug!(%from, %to, "Job slot transition");
        Ok(from)
    }

    /// Id of the job occupying the slot; `None` when the slot is free.
    pub fn active_job(&self) -> Option<JobId> {
        self.current_job.filter(|_| self.state.is_active())
    }

    /// Bind the slot to `job_id`. Call right after entering `Starting`.
    pub(crate) fn claim(&mut self, job_id: JobId) {
        self.current_job = Some(job_id);
    }

    pub fn record(&self) -> Option<&JobRecord> {
        self.record.as_ref()
    }

    pub(crate) fn install(&mut self, record: JobRecord) {
        self.record = Some(record);
    }

    pub(crate) fn mark_ended(&mut self, at: Timestamp) {
        if let Some(record) = self.record.as_mut() {
            record.ended_at = Some(at);
            record.pid = None;
        }
    }

    pub fn view(&self) -> JobStatusView {
        JobStatusView {
            state: self.state,
            job_id: self.record.as_ref().map(|r| r.job_id),
            command: self.record.as_ref().map(|r| r.command.clone()),
            started_at: self.record.as_ref().map(|r| r.started_at),
            ended_at: self.record.as_ref().and_then(|r| r.ended_at),
        }
    }
}

impl Default for JobSlot {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
