// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recovery directives (spec §3, §4.3) and the node-local self-heal
//! history that supplements them (spec §4.8, SPEC_FULL §4.9/§3 — grounded
//! in the original `RecoveryManager.recovery_history`, kept node-local and
//! never put on the wire).

use crate::action::Action;
use crate::node_id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A recovery directive is a job whose action is one of the recovery
/// family; the policy engine synthesizes these, but an operator may also
/// submit one directly through the REST surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryDirective {
    pub target: NodeId,
    pub action: Action,
}

impl RecoveryDirective {
    pub fn restart_vendor_daemon(target: NodeId) -> Self {
        Self { target, action: Action::RestartVendorDaemon }
    }

    pub fn restart_device_bridge(target: NodeId) -> Self {
        Self { target, action: Action::RestartDeviceBridge }
    }
}

/// One completed self-heal attempt, node-local only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfHealRecord {
    pub action: Action,
    pub success: bool,
    pub error: Option<String>,
    pub started_at_epoch_ms: u64,
    pub duration_ms: u64,
}

/// Bounded history of the last 10 self-heal attempts, for operator
/// visibility (SPEC_FULL §3, §4.8).
#[derive(Debug, Default)]
pub struct SelfHealHistory {
    records: VecDeque<SelfHealRecord>,
}

const MAX_HISTORY: usize = 10;

impl SelfHealHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: SelfHealRecord) {
        if self.records.len() >= MAX_HISTORY {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn records(&self) -> impl Iterator<Item = &SelfHealRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mirrors the original `RecoveryManager.get_recovery_stats()`: total
    /// attempts and how many succeeded.
    pub fn stats(&self) -> (usize, usize) {
        let total = self.records.len();
        let succeeded = self.records.iter().filter(|r| r.success).count();
        (total, succeeded)
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
