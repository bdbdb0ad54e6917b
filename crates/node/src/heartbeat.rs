// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Heartbeat Emitter (spec §4.6): every `interval`, sample the vendor
//! daemon's liveness and local resource usage, then send a HEARTBEAT. A
//! missing HEARTBEAT_ACK is not an error — the orchestrator need not
//! acknowledge every heartbeat (spec §9 open question, resolved: the node
//! simply never waits for one).

use crate::outbound::OutboundHandle;
use crate::seq::ConnectionSeq;
use crate::vendor::VendorClient;
use dfc_core::{Clock, HealthSample, NodeId};
use dfc_wire::{Envelope, HeartbeatPayload};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Samples local CPU/memory usage. A trait so tests can substitute a
/// deterministic sampler instead of reading real system metrics.
pub trait LocalMetricsSampler: Send + Sync {
    fn sample(&self) -> (f32, f32);
}

/// Reads `/proc/loadavg`-style approximations are out of scope; a
/// production deployment wires a real sampler (e.g. via `sysinfo`). This
/// default always reports zero, which is honest when nothing better is
/// configured rather than fabricating a plausible-looking number.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMetricsSampler;

impl LocalMetricsSampler for NullMetricsSampler {
    fn sample(&self) -> (f32, f32) {
        (0.0, 0.0)
    }
}

pub struct HeartbeatEmitter<C: Clock> {
    node_id: NodeId,
    clock: C,
    vendor: Arc<VendorClient>,
    sampler: Arc<dyn LocalMetricsSampler>,
    interval: Duration,
}

impl<C: Clock> HeartbeatEmitter<C> {
    pub fn new(node_id: NodeId, clock: C, vendor: Arc<VendorClient>, interval: Duration) -> Self {
        Self { node_id, clock, vendor, sampler: Arc::new(NullMetricsSampler), interval }
    }

    pub fn with_sampler(mut self, sampler: Arc<dyn LocalMetricsSampler>) -> Self {
        self.sampler = sampler;
        self
    }

    /// Runs until `stop` fires, emitting one HEARTBEAT per tick.
    pub async fn run(
        &self,
        outbound: OutboundHandle,
        seq: Arc<Mutex<ConnectionSeq>>,
        mut stop: tokio::sync::watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // first tick fires immediately; skip it, match the 30s cadence
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sample = self.sample().await;
                    let envelope = Envelope::Heartbeat {
                        node_id: self.node_id.clone(),
                        ts: self.clock.epoch_ms() as i64 / 1000,
                        seq: seq.lock().next_send(),
                        ack_seq: 0,
                        payload: HeartbeatPayload::from(sample),
                    };
                    if outbound.send(envelope).is_err() {
                        debug!(node_id = %self.node_id, "outbound channel closed, stopping heartbeat emitter");
                        break;
                    }
                }
                _ = stop.changed() => {
                    if *stop.borrow() {
                        break;
                    }
                }
            }
        }
    }

    async fn sample(&self) -> HealthSample {
        let (device_count, laixi_status) = match self.vendor.call("List", serde_json::Value::Null).await {
            Ok(value) => {
                let count = value.as_array().map(|a| a.len()).unwrap_or(0) as u32;
                (count, "ok".to_string())
            }
            Err(e) => {
                debug!(node_id = %self.node_id, error = %e, "vendor daemon unreachable while sampling heartbeat");
                (0, "unreachable".to_string())
            }
        };
        let (cpu, mem) = self.sampler.sample();
        HealthSample { device_count, laixi_status, adb_status: "ok".to_string(), cpu, mem }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
