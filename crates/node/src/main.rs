// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dfc-noded`: the on-premise node runner process.

use dfc_core::{ExecutedKeySet, NodeId, SystemClock};
use dfc_node::{config, DaemonTarget, Executor, SelfHealer, SessionClient, VendorClient};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let node_id = NodeId::new(config::node_id()?);
    let gateway_url = config::gateway_url()?;
    let laixi_ws_url = config::laixi_ws_url()?;
    let heartbeat_interval = config::heartbeat_interval();
    let clock = SystemClock;

    let vendor = Arc::new(VendorClient::new(laixi_ws_url));
    let target = DaemonTarget { process_name: "laixi".to_string(), exe_path: config::laixi_exe_path() };
    let self_healer = Arc::new(SelfHealer::new(clock.clone(), vendor.clone(), target));
    let executed_keys = Arc::new(ExecutedKeySet::default());
    let executor =
        Arc::new(Executor::new(node_id.clone(), clock.clone(), vendor.clone(), self_healer, executed_keys));

    let client =
        Arc::new(SessionClient::new(node_id.clone(), gateway_url, clock, executor, vendor, heartbeat_interval));

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    let run_handle = {
        let client = client.clone();
        tokio::spawn(async move { client.run(stop_rx).await })
    };

    wait_for_signal().await;
    tracing::info!(%node_id, "shutdown signal received, stopping session client");
    let _ = stop_tx.send(true);
    let _ = run_handle.await;
    tracing::info!(%node_id, "node stopped");
    Ok(())
}

async fn wait_for_signal() {
    if let Err(e) = wait_for_signal_fallible().await {
        tracing::error!(error = %e, "failed to install signal handler, shutting down immediately");
    }
}

async fn wait_for_signal_fallible() -> std::io::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            r = ctrl_c => r,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await
    }
}
