// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-message-type payload bodies (spec §6).

use dfc_core::{Action, ActionParams, HealthSample, JobAckState, JobResultState, JobId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// HELLO payload: node identity claim and a recovery hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloPayload {
    pub version: String,
    pub capabilities: Vec<String>,
    pub last_job_result_seq: u64,
}

/// HELLO_ACK payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelloAckPayload {
    /// ISO-8601 server time, for the node's clock-skew awareness.
    pub server_time: String,
}

/// HEARTBEAT payload, mirrors [`dfc_core::HealthSample`] on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatPayload {
    pub device_count: u32,
    pub laixi_status: String,
    pub adb_status: String,
    pub cpu: f32,
    pub mem: f32,
}

impl From<HealthSample> for HeartbeatPayload {
    fn from(h: HealthSample) -> Self {
        Self {
            device_count: h.device_count,
            laixi_status: h.laixi_status,
            adb_status: h.adb_status,
            cpu: h.cpu,
            mem: h.mem,
        }
    }
}

impl From<HeartbeatPayload> for HealthSample {
    fn from(p: HeartbeatPayload) -> Self {
        Self {
            device_count: p.device_count,
            laixi_status: p.laixi_status,
            adb_status: p.adb_status,
            cpu: p.cpu,
            mem: p.mem,
        }
    }
}

/// JOB_ASSIGN payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAssignPayload {
    pub job_id: JobId,
    pub action: Action,
    #[serde(default)]
    pub params: ActionParams,
    /// Always an array on the wire; `["all"]` for the broadcast sentinel.
    pub device_ids: Vec<String>,
    pub idempotency_key: String,
}

/// JOB_ACK payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAckPayload {
    pub job_id: JobId,
    pub state: JobAckState,
}

/// Semi-open metrics bag: `duration_ms` is always present, anything else an
/// executor wants to attach rides along in the opaque extension map
/// (spec §9: "a semi-open struct for metrics").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub duration_ms: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Metrics {
    pub fn from_duration(duration_ms: u64) -> Self {
        Self { duration_ms, extra: Map::new() }
    }
}

/// JOB_RESULT payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResultPayload {
    pub job_id: JobId,
    pub state: JobResultState,
    pub metrics: Metrics,
    pub error: Option<String>,
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
