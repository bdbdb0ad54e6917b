// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Policy Engine (spec §4.3): a periodic sweeper that marks
//! heartbeat-timed-out sessions offline and enqueues a recovery directive
//! for each. The sweeper is the only component allowed to transition a
//! session online → offline without an accompanying transport-close event.

use crate::registry::Registry;
use crate::router::Router;
use dfc_core::{ActionParams, Clock, DeviceSelector, HealthSample, NodeId, RecoveryDirective};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct PolicyConfig {
    pub sweep_interval: Duration,
    pub heartbeat_timeout: Duration,
    pub device_drop_threshold_pct: f32,
}

pub struct PolicyEngine<C: Clock> {
    registry: Arc<Registry<C>>,
    router: Arc<Router<C>>,
    config: PolicyConfig,
}

impl<C: Clock + 'static> PolicyEngine<C> {
    pub fn new(registry: Arc<Registry<C>>, router: Arc<Router<C>>, config: PolicyConfig) -> Self {
        Self { registry, router, config }
    }

    /// Run the sweeper until `shutdown` fires. Each offline transition spawns
    /// its recovery directive as a detached task so a slow-to-respond node
    /// can't stall the next tick (submit may wait up to the result
    /// deadline).
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep_once(),
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    }

    fn sweep_once(&self) {
        let newly_offline = self.registry.sweep_timeouts(self.config.heartbeat_timeout);
        for node_id in newly_offline {
            warn!(%node_id, "heartbeat timeout, marking node offline");
            self.enqueue_recovery(RecoveryDirective::restart_vendor_daemon(node_id));
        }
    }

    fn enqueue_recovery(&self, directive: RecoveryDirective) {
        let router = self.router.clone();
        let node_id = directive.target.clone();
        let action = directive.action;
        tokio::spawn(async move {
            match router.submit_recovery(node_id.clone(), action, ActionParams::new(), DeviceSelector::All).await {
                Ok(outcome) => info!(%node_id, %action, job_id = %outcome.job_id, "recovery directive completed"),
                Err(e) => warn!(%node_id, %action, error = %e, "recovery directive failed"),
            }
        });
    }

    /// Device-drop detection (spec §4.3): called from the listener as each
    /// HEARTBEAT arrives, not from the sweep tick, since it compares
    /// consecutive samples rather than elapsed wall-clock time.
    pub fn check_device_drop(&self, node_id: &NodeId, previous: &HealthSample, current: &HealthSample) {
        if let Some(fraction) = current.device_drop_fraction(previous) {
            if fraction * 100.0 >= self.config.device_drop_threshold_pct {
                warn!(
                    %node_id,
                    previous = previous.device_count,
                    current = current.device_count,
                    drop_pct = fraction * 100.0,
                    "device count dropped past threshold"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
