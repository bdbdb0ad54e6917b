// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operator-facing REST surface (spec §6): `POST /command`,
//! `GET /nodes`, `GET /health`. The only part of the orchestrator exposed
//! to callers that aren't nodes.

use super::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use dfc_core::{Action, ActionParams, Clock, CoreError, DeviceSelector, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandRequest {
    pub node_id: String,
    pub action: String,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub params: ActionParams,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub command_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn submit_command<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    Json(req): Json<CommandRequest>,
) -> impl IntoResponse {
    let action = match req.action.parse::<Action>() {
        Ok(a) => a,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(CommandResponse { success: false, command_id: None, result: None, error: Some(e.to_string()) }),
            )
        }
    };

    let selector = match req.device_id {
        Some(serial) => DeviceSelector::Serial(serial),
        None => DeviceSelector::All,
    };

    match state.router.submit(NodeId::new(req.node_id), action, req.params, selector).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(CommandResponse {
                success: matches!(outcome.state, dfc_core::JobResultState::Success),
                command_id: Some(outcome.job_id.to_string()),
                result: outcome.result,
                error: outcome.error,
            }),
        ),
        Err(e) => {
            let status = match e {
                CoreError::NodeNotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::AckTimeout(_) | CoreError::ResultTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
                CoreError::ServerShutdown => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(CommandResponse { success: false, command_id: None, result: None, error: Some(e.to_string()) }))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NodeSummary {
    pub node_id: String,
    pub status: String,
    pub connected_at_epoch_ms: u64,
    pub last_heartbeat_epoch_ms: u64,
    pub device_count: u32,
}

pub async fn list_nodes<C: Clock + 'static>(State(state): State<AppState<C>>) -> impl IntoResponse {
    let nodes: Vec<NodeSummary> = state
        .registry
        .list()
        .into_iter()
        .map(|s| NodeSummary {
            node_id: s.node_id.to_string(),
            status: s.status.to_string(),
            connected_at_epoch_ms: s.connected_at_epoch_ms,
            last_heartbeat_epoch_ms: s.last_heartbeat_epoch_ms,
            device_count: s.health.device_count,
        })
        .collect();
    Json(nodes)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub live_sessions: usize,
}

pub async fn health<C: Clock + 'static>(State(state): State<AppState<C>>) -> impl IntoResponse {
    Json(HealthResponse { status: "ok".to_string(), live_sessions: state.registry.len() })
}
