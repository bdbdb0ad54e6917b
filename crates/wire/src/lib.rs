// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire protocol between the orchestrator and a node runner (spec §4.1, §6).
//!
//! Every message is a single UTF-8 JSON object carrying a common envelope
//! (`type`, `node_id`, `ts`, `seq`, `ack_seq`, `payload`); framing itself is
//! delegated to the transport (one WebSocket text frame per envelope, no
//! additional length-prefixing at this layer).

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod close;
mod codec;
mod envelope;
mod payload;

pub use close::CloseReason;
pub use codec::{decode, encode, ProtocolError};
pub use envelope::{Envelope, MessageType};
pub use payload::{
    HeartbeatPayload, HelloAckPayload, HelloPayload, JobAckPayload, JobAssignPayload,
    JobResultPayload, Metrics,
};
