// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node-boundary errors (spec §4.11): transport, vendor-daemon, and I/O
//! failures that don't belong in [`dfc_core::CoreError`] because they're
//! specific to how this process talks to the gateway and the local vendor
//! daemon, not to the control-plane state machine itself.

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    Protocol(#[from] dfc_wire::ProtocolError),

    #[error("websocket transport error: {0}")]
    Transport(String),

    #[error("HELLO_ACK not received within deadline")]
    HandshakeTimeout,

    #[error("pong deadline exceeded")]
    PongTimeout,

    #[error("vendor daemon unreachable: {0}")]
    VendorUnreachable(String),

    #[error("vendor daemon returned an error: {0}")]
    VendorError(String),

    #[error("vendor command timed out after {0:?}")]
    VendorTimeout(std::time::Duration),

    #[error("required configuration missing: {0}")]
    MissingConfig(&'static str),

    #[error("failed to relaunch vendor daemon: {0}")]
    RelaunchFailed(String),

    #[error("missing required param: {0}")]
    InvalidParams(&'static str),
}
