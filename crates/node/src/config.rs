// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node configuration, read exclusively from the environment (spec §4.9):
//! one small typed accessor per setting, mirroring `dfc-orchestrator`'s
//! `config.rs` (itself modeled on `oj-daemon`'s `env.rs`).

use crate::error::NodeError;
use std::time::Duration;

/// Gateway address to dial, e.g. `wss://gateway.example.com/ws`.
pub fn gateway_url() -> Result<String, NodeError> {
    std::env::var("GATEWAY_URL").map_err(|_| NodeError::MissingConfig("GATEWAY_URL"))
}

/// This node's self-chosen identity, carried in every HELLO.
pub fn node_id() -> Result<String, NodeError> {
    std::env::var("NODE_ID").map_err(|_| NodeError::MissingConfig("NODE_ID"))
}

/// Endpoint of the local vendor control daemon.
pub fn laixi_ws_url() -> Result<String, NodeError> {
    std::env::var("LAIXI_WS_URL").map_err(|_| NodeError::MissingConfig("LAIXI_WS_URL"))
}

/// Path to the vendor daemon executable, used by the Self-Healer to
/// relaunch it. Required only for self-heal to function (spec §4.9).
pub fn laixi_exe_path() -> Option<String> {
    std::env::var("LAIXI_EXE_PATH").ok()
}

/// Heartbeat emission interval (spec §4.6).
pub fn heartbeat_interval() -> Duration {
    Duration::from_secs(env_u64("HEARTBEAT_INTERVAL", 30))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).unwrap_or(default)
}
