// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Self-Healer (spec §4.8): restarts the local vendor daemon (or the
//! platform device bridge) when it's judged unresponsive, whether that
//! judgement comes from the executor's own consecutive-failure counter or
//! from a recovery directive the orchestrator sent down. Both paths end up
//! idempotent, bounded-duration operations recorded into
//! [`dfc_core::SelfHealHistory`] afterwards.

use crate::error::NodeError;
use crate::vendor::VendorClient;
use dfc_core::{Action, Clock, SelfHealHistory, SelfHealRecord};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Consecutive vendor-daemon failures before self-heal triggers
/// automatically (spec §4.8).
pub const FAILURE_THRESHOLD: u32 = 5;

const KILL_SETTLE: Duration = Duration::from_secs(2);
const RELAUNCH_SETTLE: Duration = Duration::from_secs(5);

/// Named so a running instance can be found and killed by process name;
/// provided by the node operator via configuration, not discovered.
#[derive(Debug, Clone)]
pub struct DaemonTarget {
    pub process_name: String,
    pub exe_path: Option<String>,
}

pub struct SelfHealer<C: Clock> {
    clock: C,
    vendor: Arc<VendorClient>,
    target: DaemonTarget,
    consecutive_failures: AtomicU32,
    history: Mutex<SelfHealHistory>,
}

impl<C: Clock> SelfHealer<C> {
    pub fn new(clock: C, vendor: Arc<VendorClient>, target: DaemonTarget) -> Self {
        Self {
            clock,
            vendor,
            target,
            consecutive_failures: AtomicU32::new(0),
            history: Mutex::new(SelfHealHistory::new()),
        }
    }

    /// Called by the executor after every vendor-daemon call. Returns `true`
    /// if this call tripped the threshold and a restart was run.
    pub async fn record_outcome(&self, succeeded: bool) -> bool {
        if succeeded {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            return false;
        }
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures < FAILURE_THRESHOLD {
            return false;
        }
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let _ = self.restart_vendor_daemon().await;
        true
    }

    /// Idempotent: safe to invoke directly as a recovery directive even if
    /// no local failure counter tripped it (spec §4.8).
    pub async fn restart_vendor_daemon(&self) -> Result<(), NodeError> {
        self.run_heal(Action::RestartVendorDaemon, |healer| async move {
            healer.vendor.disconnect().await;
            kill_by_name(&healer.target.process_name)?;
            tokio::time::sleep(KILL_SETTLE).await;
            relaunch(healer.target.exe_path.as_deref())?;
            tokio::time::sleep(RELAUNCH_SETTLE).await;
            healer.vendor.reconnect().await
        })
        .await
    }

    /// Analogous to [`Self::restart_vendor_daemon`] but targets the
    /// platform device bridge (e.g. adb server) rather than the vendor
    /// daemon itself.
    pub async fn restart_device_bridge(&self) -> Result<(), NodeError> {
        self.run_heal(Action::RestartDeviceBridge, |healer| async move {
            kill_by_name("adb")?;
            tokio::time::sleep(KILL_SETTLE).await;
            relaunch(Some("adb"))?;
            tokio::time::sleep(RELAUNCH_SETTLE).await;
            healer.vendor.reconnect().await
        })
        .await
    }

    async fn run_heal<F, Fut>(&self, action: Action, body: F) -> Result<(), NodeError>
    where
        F: FnOnce(&Self) -> Fut,
        Fut: std::future::Future<Output = Result<(), NodeError>>,
    {
        let started_at = self.clock.epoch_ms();
        let start = self.clock.now();
        info!(%action, "self-heal starting");
        let result = body(self).await;
        let duration_ms = self.clock.now().saturating_duration_since(start).as_millis() as u64;
        match &result {
            Ok(()) => info!(%action, duration_ms, "self-heal succeeded"),
            Err(e) => warn!(%action, duration_ms, error = %e, "self-heal failed"),
        }
        self.history.lock().push(SelfHealRecord {
            action,
            success: result.is_ok(),
            error: result.as_ref().err().map(ToString::to_string),
            started_at_epoch_ms: started_at,
            duration_ms,
        });
        result
    }

    pub fn history_snapshot(&self) -> Vec<SelfHealRecord> {
        self.history.lock().records().cloned().collect()
    }

    #[cfg(test)]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }
}

fn kill_by_name(process_name: &str) -> Result<(), NodeError> {
    let status = std::process::Command::new("pkill")
        .arg("-f")
        .arg(process_name)
        .status()
        .map_err(|e| NodeError::RelaunchFailed(format!("invoking pkill: {e}")))?;
    // pkill exits 1 when no process matched, which is not a failure here:
    // a daemon that was already dead is exactly what we want before relaunch.
    if status.success() || status.code() == Some(1) {
        Ok(())
    } else {
        Err(NodeError::RelaunchFailed(format!("pkill exited with {status}")))
    }
}

fn relaunch(exe_path: Option<&str>) -> Result<(), NodeError> {
    let exe_path = exe_path.ok_or(NodeError::MissingConfig("LAIXI_EXE_PATH"))?;
    std::process::Command::new(exe_path)
        .spawn()
        .map_err(|e| NodeError::RelaunchFailed(format!("spawning {exe_path}: {e}")))?;
    Ok(())
}

#[cfg(test)]
#[path = "self_heal_tests.rs"]
mod tests;
