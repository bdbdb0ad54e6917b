// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator-boundary errors (spec §4.11): transport and I/O failures
//! that don't belong in [`dfc_core::CoreError`] because they're specific to
//! how this process talks to the outside world, not to the control-plane
//! state machine itself.

use dfc_wire::ProtocolError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Core(#[from] dfc_core::CoreError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("failed to bind listener on {0}: {1}")]
    Bind(String, std::io::Error),

    #[error("websocket transport error: {0}")]
    Transport(String),

    #[error("required configuration missing: {0}")]
    MissingConfig(&'static str),
}
