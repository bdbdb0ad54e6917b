// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Job Table (spec §3, §4.4): per-job result channels installed at
//! submission time and removed on resolution or deadline, rather than one
//! process-wide map of pending futures keyed by command-id (spec §9
//! "Future-keyed waits").

use dfc_core::{Job, JobAckState, JobId, JobResultState};
use dfc_wire::Metrics;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

/// What the node ultimately reported for a job, or `None` if the Router
/// gave up waiting.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub state: JobResultState,
    pub metrics: Metrics,
    pub error: Option<String>,
}

struct JobEntry {
    job: Job,
    ack_tx: Option<oneshot::Sender<JobAckState>>,
    result_tx: Option<oneshot::Sender<JobOutcome>>,
}

#[derive(Default)]
pub struct JobTable {
    inner: Mutex<HashMap<JobId, JobEntry>>,
}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly assigned job along with the one-shot channels its
    /// submitter is waiting on.
    pub fn insert_pending(
        &self,
        job: Job,
        ack_tx: oneshot::Sender<JobAckState>,
        result_tx: oneshot::Sender<JobOutcome>,
    ) {
        let id = job.id;
        self.inner.lock().insert(
            id,
            JobEntry { job, ack_tx: Some(ack_tx), result_tx: Some(result_tx) },
        );
    }

    /// Apply a JOB_ACK: deliver it to the waiting submitter if one is still
    /// around. Returns `false` if the job is unknown (already resolved,
    /// timed out and removed, or never existed) — the caller logs a
    /// warning rather than treating it as fatal.
    pub fn resolve_ack(&self, job_id: JobId, state: JobAckState, now_epoch_ms: u64) -> bool {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.get_mut(&job_id) else { return false };
        entry.job.mark_acked(now_epoch_ms);
        match entry.ack_tx.take() {
            Some(tx) => {
                let _ = tx.send(state);
                true
            }
            None => false,
        }
    }

    /// Apply a JOB_RESULT: deliver it and remove the entry. Returns `false`
    /// for a late or unmatched result (spec §7 `ResultTimeout`: "a late
    /// JOB_RESULT is dropped with a warning").
    pub fn resolve_result(&self, job_id: JobId, outcome: JobOutcome, now_epoch_ms: u64) -> bool {
        let mut inner = self.inner.lock();
        let Some(mut entry) = inner.remove(&job_id) else { return false };
        match outcome.state {
            JobResultState::Success => {
                let result = serde_json::to_value(&outcome.metrics).unwrap_or_default();
                entry.job.mark_success(result, now_epoch_ms)
            }
            JobResultState::Failed => entry.job.mark_failed(
                outcome.error.clone().unwrap_or_default(),
                now_epoch_ms,
            ),
        }
        match entry.result_tx.take() {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    /// Drop the ack wait after `AckTimeout` (spec §4.4 step 5): the
    /// submitter stops waiting, but the entry (and its result channel)
    /// stays in case the node executes and reports anyway.
    pub fn abandon_ack_wait(&self, job_id: &JobId) {
        if let Some(entry) = self.inner.lock().get_mut(job_id) {
            entry.ack_tx = None;
        }
    }

    /// Remove a job outright (spec §4.4 step 6, `ResultTimeout` path, and
    /// the `NodeNotAvailable` path before a send is even attempted).
    pub fn remove(&self, job_id: &JobId) {
        self.inner.lock().remove(job_id);
    }

    /// Cancel every in-flight wait with `ServerShutdown` (spec §5): used
    /// during orderly orchestrator shutdown.
    pub fn cancel_all(&self) {
        let mut inner = self.inner.lock();
        for (_, mut entry) in inner.drain() {
            entry.ack_tx.take();
            entry.result_tx.take();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "job_table_tests.rs"]
mod tests;
