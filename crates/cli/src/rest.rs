// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin REST client for the orchestrator's operator-facing surface
//! (spec §4.12): the CLI only ever speaks HTTP + JSON here, never touches a
//! privileged Registry/JobTable handle directly.

use anyhow::{Context, Result};
use dfc_core::ActionParams;
use dfc_orchestrator::{CommandRequest, CommandResponse, HealthResponse, NodeSummary};

pub struct GatewayClient {
    base_url: String,
    http: reqwest::Client,
}

impl GatewayClient {
    pub fn new(base_url: String) -> Self {
        Self { base_url, http: reqwest::Client::new() }
    }

    pub async fn submit_command(
        &self,
        node_id: String,
        action: String,
        device_id: Option<String>,
        params: ActionParams,
    ) -> Result<CommandResponse> {
        let request = CommandRequest { node_id, action, device_id, params };
        self.http
            .post(format!("{}/command", self.base_url))
            .json(&request)
            .send()
            .await
            .context("sending command to orchestrator")?
            .json()
            .await
            .context("decoding command response")
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeSummary>> {
        self.http
            .get(format!("{}/nodes", self.base_url))
            .send()
            .await
            .context("listing nodes")?
            .error_for_status()
            .context("orchestrator returned an error for /nodes")?
            .json()
            .await
            .context("decoding node list")
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.http
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .context("checking orchestrator health")?
            .error_for_status()
            .context("orchestrator returned an error for /health")?
            .json()
            .await
            .context("decoding health response")
    }
}

#[cfg(test)]
#[path = "rest_tests.rs"]
mod tests;
