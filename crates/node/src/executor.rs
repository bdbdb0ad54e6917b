// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Executor (spec §4.7): turns one JOB_ASSIGN into a JOB_ACK followed,
//! on a separate worker task, by a JOB_RESULT. Idempotency is enforced by
//! inserting the key into the Executed-Key Set *before* the worker runs, so
//! an in-flight duplicate is suppressed the same as a completed one.
//!
//! `Action` is a closed, strongly-typed enum (spec §9's tagged-union
//! design), so a malformed action string can never reach this module —
//! it fails to deserialize at the wire layer and the frame is dropped
//! there (see `dfc-orchestrator`/`dfc-node`'s "unknown types are logged
//! and ignored" handling). The `UnknownAction` error spec §4.7 describes
//! therefore has no counterpart here; see DESIGN.md.

use crate::error::NodeError;
use crate::outbound::OutboundHandle;
use crate::seq::ConnectionSeq;
use crate::self_heal::SelfHealer;
use crate::vendor::VendorClient;
use dfc_core::{Action, ActionParams, Clock, ExecutedKeySet, JobAckState, JobId, JobResultState, NodeId};
use dfc_wire::{Envelope, JobAckPayload, JobAssignPayload, JobResultPayload, Metrics};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything the executor needs that outlives any one connection: the
/// vendor adapter, the self-healer, and the idempotency cache all survive
/// reconnects (spec §4.5 "Reconnect ownership graph" — these three are
/// independent components, not fields of a god object).
pub struct Executor<C: Clock> {
    node_id: NodeId,
    clock: C,
    vendor: Arc<VendorClient>,
    self_healer: Arc<SelfHealer<C>>,
    executed_keys: Arc<ExecutedKeySet>,
}

impl<C: Clock + 'static> Executor<C> {
    pub fn new(
        node_id: NodeId,
        clock: C,
        vendor: Arc<VendorClient>,
        self_healer: Arc<SelfHealer<C>>,
        executed_keys: Arc<ExecutedKeySet>,
    ) -> Self {
        Self { node_id, clock, vendor, self_healer, executed_keys }
    }

    /// Handle one JOB_ASSIGN (spec §4.7 steps 1-4). `outbound`/`seq` are
    /// bound to the connection the assignment arrived on; a worker spawned
    /// here sends its JOB_RESULT back over the same handle; if the
    /// connection has since dropped, that send is simply a no-op.
    pub fn handle_assign(
        self: &Arc<Self>,
        payload: JobAssignPayload,
        outbound: OutboundHandle,
        seq: Arc<Mutex<ConnectionSeq>>,
    ) {
        let job_id = payload.job_id;
        if !self.executed_keys.insert(payload.idempotency_key.clone()) {
            info!(node_id = %self.node_id, %job_id, "idempotency key already seen, replying already_done");
            self.send_ack(&outbound, &seq, job_id, JobAckState::AlreadyDone);
            return;
        }

        self.send_ack(&outbound, &seq, job_id, JobAckState::Started);

        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(payload, outbound, seq).await });
    }

    fn send_ack(&self, outbound: &OutboundHandle, seq: &Arc<Mutex<ConnectionSeq>>, job_id: JobId, state: JobAckState) {
        let envelope = Envelope::JobAck {
            node_id: self.node_id.clone(),
            ts: self.clock.epoch_ms() as i64 / 1000,
            seq: seq.lock().next_send(),
            ack_seq: 0,
            payload: JobAckPayload { job_id, state },
        };
        let _ = outbound.send(envelope);
    }

    async fn run(&self, payload: JobAssignPayload, outbound: OutboundHandle, seq: Arc<Mutex<ConnectionSeq>>) {
        let job_id = payload.job_id;
        let action = payload.action;
        let start = self.clock.now();

        let outcome = if action.is_recovery() {
            self.run_recovery(action).await
        } else {
            self.run_vendor(action, &payload.params, &payload.device_ids).await
        };

        let duration_ms = self.clock.now().saturating_duration_since(start).as_millis() as u64;
        let (state, metrics, error) = match outcome {
            Ok(value) => {
                let mut metrics = Metrics::from_duration(duration_ms);
                if !value.is_null() {
                    metrics.extra.insert("result".to_string(), value);
                }
                (JobResultState::Success, metrics, None)
            }
            Err(e) => {
                warn!(node_id = %self.node_id, %job_id, %action, error = %e, "job execution failed");
                (JobResultState::Failed, Metrics::from_duration(duration_ms), Some(e.to_string()))
            }
        };

        info!(node_id = %self.node_id, %job_id, %action, ?state, duration_ms, "job finished");

        let envelope = Envelope::JobResult {
            node_id: self.node_id.clone(),
            ts: self.clock.epoch_ms() as i64 / 1000,
            seq: seq.lock().next_send(),
            ack_seq: 0,
            payload: JobResultPayload { job_id, state, metrics, error },
        };
        let _ = outbound.send(envelope);
    }

    async fn run_recovery(&self, action: Action) -> Result<Value, NodeError> {
        match action {
            Action::RestartVendorDaemon => self.self_healer.restart_vendor_daemon().await.map(|_| Value::Null),
            Action::RestartDeviceBridge => self.self_healer.restart_device_bridge().await.map(|_| Value::Null),
            _ => unreachable!("run_recovery only called for recovery actions"),
        }
    }

    async fn run_vendor(&self, action: Action, params: &ActionParams, device_ids: &[String]) -> Result<Value, NodeError> {
        let (verb, mut vendor_params) = translate(action, params)?;
        if !device_ids.is_empty() {
            vendor_params.insert(
                "devices".to_string(),
                Value::Array(device_ids.iter().map(|d| Value::String(d.clone())).collect()),
            );
        }
        let result = self.vendor.call(verb, Value::Object(vendor_params)).await;
        self.self_healer.record_outcome(result.is_ok()).await;
        result
    }
}

/// Translate an abstract action into its vendor-daemon verb and params
/// (spec §4.7's action table). Returns the verb and a fresh params map the
/// caller may still enrich (e.g. with the device selector).
fn translate(action: Action, params: &ActionParams) -> Result<(&'static str, Map<String, Value>), NodeError> {
    match action {
        Action::List => Ok(("List", Map::new())),
        Action::Watch => {
            let url = required_str(params, "url")?;
            let mut m = Map::new();
            m.insert("cmd".to_string(), Value::String(format!("am start -a android.intent.action.VIEW -d {url}")));
            Ok(("adb", m))
        }
        Action::Tap => {
            let x = required_i64(params, "x")?;
            let y = required_i64(params, "y")?;
            let mut m = Map::new();
            m.insert("x".to_string(), Value::from(x));
            m.insert("y".to_string(), Value::from(y));
            Ok(("onTap", m))
        }
        Action::Swipe => {
            let mut m = Map::new();
            m.insert("x1".to_string(), Value::from(required_i64(params, "x1")?));
            m.insert("y1".to_string(), Value::from(required_i64(params, "y1")?));
            m.insert("x2".to_string(), Value::from(required_i64(params, "x2")?));
            m.insert("y2".to_string(), Value::from(required_i64(params, "y2")?));
            m.insert("duration".to_string(), Value::from(required_i64(params, "duration")?));
            Ok(("onSwipe", m))
        }
        Action::Adb => {
            let cmd = required_str(params, "cmd")?;
            let mut m = Map::new();
            m.insert("cmd".to_string(), Value::String(cmd.to_string()));
            Ok(("adb", m))
        }
        Action::Home => {
            let mut m = Map::new();
            m.insert("cmd".to_string(), Value::String("input keyevent 3".to_string()));
            Ok(("adb", m))
        }
        Action::Back => {
            let mut m = Map::new();
            m.insert("cmd".to_string(), Value::String("input keyevent 4".to_string()));
            Ok(("adb", m))
        }
        Action::CurrentApp => Ok(("CurrentAppInfo", Map::new())),
        Action::RestartVendorDaemon | Action::RestartDeviceBridge => {
            unreachable!("recovery actions are intercepted before translate")
        }
    }
}

fn required_str<'a>(params: &'a ActionParams, key: &'static str) -> Result<&'a str, NodeError> {
    params.get_str(key).ok_or(NodeError::InvalidParams(key))
}

fn required_i64(params: &ActionParams, key: &'static str) -> Result<i64, NodeError> {
    params.get_i64(key).ok_or(NodeError::InvalidParams(key))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
