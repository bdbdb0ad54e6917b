// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-reported health, carried in every HEARTBEAT.

use serde::{Deserialize, Serialize};

/// Liveness and resource sample a node attaches to each heartbeat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub device_count: u32,
    pub laixi_status: String,
    pub adb_status: String,
    pub cpu: f32,
    pub mem: f32,
}

impl HealthSample {
    /// Relative change in device count versus a prior sample, as a
    /// fraction (0.1 == 10%). Used by the policy engine's device-drop
    /// detection; `None` when there is no prior sample to compare against
    /// or the prior count was zero (no meaningful percentage).
    pub fn device_drop_fraction(&self, previous: &HealthSample) -> Option<f32> {
        if previous.device_count == 0 {
            return None;
        }
        if self.device_count >= previous.device_count {
            return None;
        }
        let dropped = previous.device_count - self.device_count;
        Some(dropped as f32 / previous.device_count as f32)
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
