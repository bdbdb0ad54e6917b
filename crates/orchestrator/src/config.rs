// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration, read exclusively from the environment
//! (spec §4.9): one small typed accessor per setting, not a single
//! monolithic config struct parsed once at startup — the style
//! `oj-daemon`'s `env.rs` uses.

use std::time::Duration;

/// Bind address for the combined WebSocket + REST listener.
pub fn listen_addr() -> String {
    std::env::var("DFC_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:7443".to_string())
}

/// How long a session may go without a heartbeat before the sweeper marks
/// it offline (spec §4.3).
pub fn heartbeat_timeout() -> Duration {
    Duration::from_secs(env_u64("DFC_HEARTBEAT_TIMEOUT_SECS", 30))
}

/// Sweeper tick interval (spec §4.3).
pub fn sweep_interval() -> Duration {
    Duration::from_secs(env_u64("DFC_SWEEP_INTERVAL_SECS", 10))
}

/// Default JOB_ACK deadline (spec §4.4).
pub fn ack_deadline() -> Duration {
    Duration::from_secs(env_u64("DFC_ACK_DEADLINE_SECS", 5))
}

/// Default JOB_RESULT deadline (spec §4.4), overridable per action by the
/// caller of `Router::submit_with_result_deadline`.
pub fn result_deadline() -> Duration {
    Duration::from_secs(env_u64("DFC_RESULT_DEADLINE_SECS", 60))
}

/// Device-drop warning threshold, as a percentage of the prior sample
/// (spec §4.3).
pub fn device_drop_threshold_pct() -> f32 {
    std::env::var("DFC_DEVICE_DROP_THRESHOLD_PCT")
        .ok()
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(10.0)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default)
}
