// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The job state machine (spec §3, §4.4).

use crate::action::{Action, ActionParams};
use crate::node_id::NodeId;
use crate::JobId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default ack deadline (spec §4.4): `AckTimeout` fires if no JOB_ACK
/// arrives within this window of assignment.
pub const DEFAULT_ACK_DEADLINE: Duration = Duration::from_secs(5);

/// Default result deadline (spec §4.4), overridable per action.
pub const DEFAULT_RESULT_DEADLINE: Duration = Duration::from_secs(60);

/// Which device(s) on the node a job targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeviceSelector {
    All,
    Serial(String),
}

impl DeviceSelector {
    /// The wire representation is always an array; `All` is `["all"]`.
    pub fn as_device_ids(&self) -> Vec<String> {
        match self {
            DeviceSelector::All => vec!["all".to_string()],
            DeviceSelector::Serial(s) => vec![s.clone()],
        }
    }
}

/// One of the five terminal-or-not states a job can be in (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Assigned,
    Acked,
    Success,
    Failed,
    TimedOut,
}

crate::simple_display! {
    JobState {
        Pending => "pending",
        Assigned => "assigned",
        Acked => "acked",
        Success => "success",
        Failed => "failed",
        TimedOut => "timed_out",
    }
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Success | JobState::Failed | JobState::TimedOut)
    }
}

/// JOB_ACK payload state (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobAckState {
    Started,
    AlreadyDone,
}

/// JOB_RESULT payload state (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobResultState {
    Success,
    Failed,
}

/// An abstract work item tracked end-to-end by the Router's JobTable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub target: NodeId,
    pub action: Action,
    pub params: ActionParams,
    pub device_selector: DeviceSelector,
    pub idempotency_key: String,
    #[serde(skip, default = "default_duration_ack")]
    pub ack_deadline: Duration,
    #[serde(skip, default = "default_duration_result")]
    pub result_deadline: Duration,
    pub state: JobState,
    pub created_at_epoch_ms: u64,
    pub assigned_at_epoch_ms: Option<u64>,
    pub acked_at_epoch_ms: Option<u64>,
    pub completed_at_epoch_ms: Option<u64>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

fn default_duration_ack() -> Duration {
    DEFAULT_ACK_DEADLINE
}

fn default_duration_result() -> Duration {
    DEFAULT_RESULT_DEADLINE
}

impl Job {
    /// Create a new job in `Pending` state. `idempotency_key` defaults to
    /// the job's own id (spec §3) when the caller does not supply one.
    pub fn new(
        target: NodeId,
        action: Action,
        params: ActionParams,
        device_selector: DeviceSelector,
        idempotency_key: Option<String>,
        created_at_epoch_ms: u64,
    ) -> Self {
        let id = JobId::new();
        let idempotency_key = idempotency_key.unwrap_or_else(|| id.to_string());
        Self {
            id,
            target,
            action,
            params,
            device_selector,
            idempotency_key,
            ack_deadline: DEFAULT_ACK_DEADLINE,
            result_deadline: DEFAULT_RESULT_DEADLINE,
            state: JobState::Pending,
            created_at_epoch_ms,
            assigned_at_epoch_ms: None,
            acked_at_epoch_ms: None,
            completed_at_epoch_ms: None,
            result: None,
            error: None,
        }
    }

    pub fn with_result_deadline(mut self, deadline: Duration) -> Self {
        self.result_deadline = deadline;
        self
    }

    pub fn mark_assigned(&mut self, now_epoch_ms: u64) {
        self.state = JobState::Assigned;
        self.assigned_at_epoch_ms = Some(now_epoch_ms);
    }

    pub fn mark_acked(&mut self, now_epoch_ms: u64) {
        self.state = JobState::Acked;
        self.acked_at_epoch_ms = Some(now_epoch_ms);
    }

    pub fn mark_success(&mut self, result: serde_json::Value, now_epoch_ms: u64) {
        self.state = JobState::Success;
        self.result = Some(result);
        self.completed_at_epoch_ms = Some(now_epoch_ms);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>, now_epoch_ms: u64) {
        self.state = JobState::Failed;
        self.error = Some(error.into());
        self.completed_at_epoch_ms = Some(now_epoch_ms);
    }

    pub fn mark_timed_out(&mut self, now_epoch_ms: u64) {
        self.state = JobState::TimedOut;
        self.completed_at_epoch_ms = Some(now_epoch_ms);
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
