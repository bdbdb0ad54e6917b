// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dfc-orchestratord`: the cloud-side control plane process.

use dfc_core::SystemClock;
use dfc_orchestrator::{config, AppState, JobTable, PolicyConfig, PolicyEngine, Registry, Router, RouterConfig};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let listen_addr = config::listen_addr();
    let clock = SystemClock;

    let registry = Arc::new(Registry::new(clock.clone()));
    let job_table = Arc::new(JobTable::new());
    let router_config =
        RouterConfig { ack_deadline: config::ack_deadline(), result_deadline: config::result_deadline() };
    let router = Arc::new(Router::new(registry.clone(), job_table.clone(), router_config, clock.clone()));
    let policy_config = PolicyConfig {
        sweep_interval: config::sweep_interval(),
        heartbeat_timeout: config::heartbeat_timeout(),
        device_drop_threshold_pct: config::device_drop_threshold_pct(),
    };
    let policy = Arc::new(PolicyEngine::new(registry.clone(), router.clone(), policy_config));

    let state = AppState { registry, job_table, router: router.clone(), policy: policy.clone(), clock };
    let app = dfc_orchestrator::app(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| dfc_orchestrator::OrchestratorError::Bind(listen_addr.clone(), e))?;
    tracing::info!(%listen_addr, "orchestrator listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let sweeper = tokio::spawn(policy.run(shutdown_rx));

    let serve = axum::serve(listener, app).with_graceful_shutdown(wait_for_signal());
    serve.await?;

    let _ = shutdown_tx.send(true);
    let _ = sweeper.await;
    router.shutdown();
    tracing::info!("orchestrator stopped");
    Ok(())
}

async fn wait_for_signal() {
    if let Err(e) = wait_for_signal_fallible().await {
        tracing::error!(error = %e, "failed to install signal handler, shutting down immediately");
        return;
    }
    tracing::info!("shutdown signal received");
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
