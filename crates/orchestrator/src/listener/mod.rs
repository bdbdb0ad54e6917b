// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The combined WebSocket + REST listener (spec §4.1, §6): one `axum`
//! server exposing the node-facing `/ws` upgrade route alongside the
//! operator-facing REST surface.

pub mod rest;
mod ws;

use crate::job_table::JobTable;
use crate::policy::PolicyEngine;
use crate::registry::Registry;
use crate::router::Router;
use axum::routing::{get, post};
use dfc_core::Clock;
use std::sync::Arc;

/// Shared state every handler sees; cheap to clone since it's all `Arc`s.
#[derive(Clone)]
pub struct AppState<C: Clock> {
    pub registry: Arc<Registry<C>>,
    pub job_table: Arc<JobTable>,
    pub router: Arc<Router<C>>,
    pub policy: Arc<PolicyEngine<C>>,
    pub clock: C,
}

pub fn app<C: Clock + 'static>(state: AppState<C>) -> axum::Router {
    axum::Router::new()
        .route("/ws", get(ws::upgrade::<C>))
        .route("/command", post(rest::submit_command::<C>))
        .route("/nodes", get(rest::list_nodes::<C>))
        .route("/health", get(rest::health::<C>))
        .with_state(state)
}
