// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds visible at the core's boundary (spec §7).

use crate::node_id::NodeId;
use crate::JobId;

/// Errors the Router's `submit` contract can return to its caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    /// No live session for the target node-id.
    #[error("no live session for node {0}")]
    NodeNotAvailable(NodeId),

    /// JOB_ASSIGN sent, no JOB_ACK within the ack deadline.
    #[error("job {0} was not acked in time")]
    AckTimeout(JobId),

    /// JOB_RESULT not received within the result deadline.
    #[error("job {0} did not complete in time")]
    ResultTimeout(JobId),

    /// HELLO was missing or malformed.
    #[error("handshake failed: {0}")]
    Unauthorized(String),

    /// The vendor daemon was unreachable or erred after self-heal attempts.
    #[error("executor failed: {0}")]
    ExecutorFailure(String),

    /// The idempotency key had already been seen; no second execution.
    #[error("job {0} already completed (idempotency key reused)")]
    AlreadyDone(JobId),

    /// The orchestrator is shutting down; in-flight waits were cancelled.
    #[error("server is shutting down")]
    ServerShutdown,
}
