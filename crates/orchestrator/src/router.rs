// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Router (spec §4.4): `submit` takes a job from the REST layer all the
//! way through JOB_ASSIGN, JOB_ACK, and JOB_RESULT, or fails with one of
//! the §7 error kinds.

use crate::job_table::{JobOutcome, JobTable};
use crate::registry::Registry;
use dfc_core::{Action, ActionParams, Clock, CoreError, DeviceSelector, Job, JobId, JobResultState, NodeId};
use dfc_wire::{Envelope, JobAssignPayload};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    pub ack_deadline: Duration,
    pub result_deadline: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            ack_deadline: dfc_core::job::DEFAULT_ACK_DEADLINE,
            result_deadline: dfc_core::job::DEFAULT_RESULT_DEADLINE,
        }
    }
}

/// What a successful (from the Router's point of view — the job may still
/// have failed on the node) `submit` returns to the REST layer.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub job_id: JobId,
    pub state: JobResultState,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

pub struct Router<C: Clock> {
    registry: Arc<Registry<C>>,
    job_table: Arc<JobTable>,
    config: RouterConfig,
    clock: C,
}

impl<C: Clock> Router<C> {
    pub fn new(registry: Arc<Registry<C>>, job_table: Arc<JobTable>, config: RouterConfig, clock: C) -> Self {
        Self { registry, job_table, config, clock }
    }

    /// Spec §4.4 algorithm, steps 1-6.
    pub async fn submit(
        &self,
        node_id: NodeId,
        action: Action,
        params: ActionParams,
        device_selector: DeviceSelector,
    ) -> Result<SubmitOutcome, CoreError> {
        self.submit_with_result_deadline(node_id, action, params, device_selector, self.config.result_deadline)
            .await
    }

    /// Same as [`Self::submit`] but with an action-specific result deadline
    /// (spec §4.4: "default 60s; configurable per action").
    pub async fn submit_with_result_deadline(
        &self,
        node_id: NodeId,
        action: Action,
        params: ActionParams,
        device_selector: DeviceSelector,
        result_deadline: Duration,
    ) -> Result<SubmitOutcome, CoreError> {
        self.dispatch(node_id, action, params, device_selector, result_deadline, true).await
    }

    /// Used only by the policy engine's sweeper to deliver a recovery
    /// directive to the very session it just marked offline (spec §4.3):
    /// the offline status records that the sweeper stopped trusting the
    /// node's heartbeats, not that its transport is known to be gone, so
    /// the directive must still go out. Operator-facing submissions go
    /// through [`Self::submit`] instead, which fails fast against an
    /// offline session (spec §8 scenario 3).
    pub async fn submit_recovery(
        &self,
        node_id: NodeId,
        action: Action,
        params: ActionParams,
        device_selector: DeviceSelector,
    ) -> Result<SubmitOutcome, CoreError> {
        self.dispatch(node_id, action, params, device_selector, self.config.result_deadline, false).await
    }

    async fn dispatch(
        &self,
        node_id: NodeId,
        action: Action,
        params: ActionParams,
        device_selector: DeviceSelector,
        result_deadline: Duration,
        require_online: bool,
    ) -> Result<SubmitOutcome, CoreError> {
        if require_online && !self.registry.is_online(&node_id) {
            return Err(CoreError::NodeNotAvailable(node_id));
        }

        let now = self.clock.epoch_ms();
        let wire_params = params.clone();
        let job = Job::new(node_id.clone(), action, params, device_selector.clone(), None, now)
            .with_result_deadline(result_deadline);
        let job_id = job.id;
        let idempotency_key = job.idempotency_key.clone();

        let (ack_tx, ack_rx) = oneshot::channel();
        let (result_tx, result_rx) = oneshot::channel();
        self.job_table.insert_pending(job, ack_tx, result_tx);

        if let Err(e) =
            self.send_assign(&node_id, job_id, action, &idempotency_key, device_selector, &wire_params)
        {
            self.job_table.remove(&job_id);
            return Err(e);
        }

        info!(%node_id, %job_id, %action, "job assigned");

        match tokio::time::timeout(self.config.ack_deadline, ack_rx).await {
            Ok(Ok(_ack_state)) => {}
            Ok(Err(_canceled)) => return Err(CoreError::ServerShutdown),
            Err(_elapsed) => {
                warn!(%node_id, %job_id, "no JOB_ACK within ack deadline");
                self.job_table.abandon_ack_wait(&job_id);
                return Err(CoreError::AckTimeout(job_id));
            }
        }

        match tokio::time::timeout(result_deadline, result_rx).await {
            Ok(Ok(outcome)) => Ok(to_submit_outcome(job_id, outcome)),
            Ok(Err(_canceled)) => Err(CoreError::ServerShutdown),
            Err(_elapsed) => {
                warn!(%node_id, %job_id, "no JOB_RESULT within result deadline");
                self.job_table.remove(&job_id);
                Err(CoreError::ResultTimeout(job_id))
            }
        }
    }

    fn send_assign(
        &self,
        node_id: &NodeId,
        job_id: JobId,
        action: Action,
        idempotency_key: &str,
        device_selector: DeviceSelector,
        params: &ActionParams,
    ) -> Result<(), CoreError> {
        let (outbound, seq) = self
            .registry
            .prepare_send(node_id)
            .ok_or_else(|| CoreError::NodeNotAvailable(node_id.clone()))?;
        let envelope = Envelope::JobAssign {
            node_id: node_id.clone(),
            ts: self.clock.epoch_ms() as i64 / 1000,
            seq,
            ack_seq: 0,
            payload: JobAssignPayload {
                job_id,
                action,
                params: params.clone(),
                device_ids: device_selector.as_device_ids(),
                idempotency_key: idempotency_key.to_string(),
            },
        };
        outbound.send(envelope).map_err(|_| CoreError::NodeNotAvailable(node_id.clone()))
    }

    /// Cancel every in-flight wait with `ServerShutdown` and broadcast
    /// SERVER_SHUTDOWN to every live session (spec §5).
    pub fn shutdown(&self) {
        self.job_table.cancel_all();
        let now = self.clock.epoch_ms() as i64 / 1000;
        for (node_id, handle) in self.registry.all_outbound() {
            let envelope = Envelope::ServerShutdown { node_id, ts: now, seq: 0, ack_seq: 0 };
            let _ = handle.send(envelope);
            let _ = handle.close(dfc_wire::CloseReason::Normal);
        }
    }
}

fn to_submit_outcome(job_id: JobId, outcome: JobOutcome) -> SubmitOutcome {
    SubmitOutcome {
        job_id,
        state: outcome.state,
        result: Some(serde_json::to_value(&outcome.metrics).unwrap_or_default()),
        error: outcome.error,
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
