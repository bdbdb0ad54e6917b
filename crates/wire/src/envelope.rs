// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The wire envelope (spec §4.1, §6): one JSON object per message, tagged by
//! `type`, carrying the common header fields alongside a type-specific body.

use dfc_core::NodeId;
use serde::{Deserialize, Serialize};

use crate::payload::{
    HeartbeatPayload, HelloAckPayload, HelloPayload, JobAckPayload, JobAssignPayload,
    JobResultPayload,
};

/// Discriminator only, with no payload attached. Useful for logging and for
/// dispatch tables that care about the message's kind before decoding the
/// rest of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Hello,
    HelloAck,
    Heartbeat,
    HeartbeatAck,
    JobAssign,
    JobAck,
    JobResult,
    ServerShutdown,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            MessageType::Hello => "HELLO",
            MessageType::HelloAck => "HELLO_ACK",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::HeartbeatAck => "HEARTBEAT_ACK",
            MessageType::JobAssign => "JOB_ASSIGN",
            MessageType::JobAck => "JOB_ACK",
            MessageType::JobResult => "JOB_RESULT",
            MessageType::ServerShutdown => "SERVER_SHUTDOWN",
        })
    }
}

/// One wire message. Each variant carries the envelope's common header
/// fields (`node_id`, `ts`, `seq`, `ack_seq`) plus its type-specific payload;
/// serde's internal tagging (`type`) flattens them into one JSON object that
/// matches the shape documented in spec §6 exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    #[serde(rename = "HELLO")]
    Hello { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64, payload: HelloPayload },
    #[serde(rename = "HELLO_ACK")]
    HelloAck { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64, payload: HelloAckPayload },
    #[serde(rename = "HEARTBEAT")]
    Heartbeat { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64, payload: HeartbeatPayload },
    #[serde(rename = "HEARTBEAT_ACK")]
    HeartbeatAck { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64 },
    #[serde(rename = "JOB_ASSIGN")]
    JobAssign { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64, payload: JobAssignPayload },
    #[serde(rename = "JOB_ACK")]
    JobAck { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64, payload: JobAckPayload },
    #[serde(rename = "JOB_RESULT")]
    JobResult { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64, payload: JobResultPayload },
    #[serde(rename = "SERVER_SHUTDOWN")]
    ServerShutdown { node_id: NodeId, ts: i64, seq: u64, ack_seq: u64 },
}

impl Envelope {
    pub fn kind(&self) -> MessageType {
        match self {
            Envelope::Hello { .. } => MessageType::Hello,
            Envelope::HelloAck { .. } => MessageType::HelloAck,
            Envelope::Heartbeat { .. } => MessageType::Heartbeat,
            Envelope::HeartbeatAck { .. } => MessageType::HeartbeatAck,
            Envelope::JobAssign { .. } => MessageType::JobAssign,
            Envelope::JobAck { .. } => MessageType::JobAck,
            Envelope::JobResult { .. } => MessageType::JobResult,
            Envelope::ServerShutdown { .. } => MessageType::ServerShutdown,
        }
    }

    pub fn node_id(&self) -> &NodeId {
        match self {
            Envelope::Hello { node_id, .. }
            | Envelope::HelloAck { node_id, .. }
            | Envelope::Heartbeat { node_id, .. }
            | Envelope::HeartbeatAck { node_id, .. }
            | Envelope::JobAssign { node_id, .. }
            | Envelope::JobAck { node_id, .. }
            | Envelope::JobResult { node_id, .. }
            | Envelope::ServerShutdown { node_id, .. } => node_id,
        }
    }

    pub fn seq(&self) -> u64 {
        match self {
            Envelope::Hello { seq, .. }
            | Envelope::HelloAck { seq, .. }
            | Envelope::Heartbeat { seq, .. }
            | Envelope::HeartbeatAck { seq, .. }
            | Envelope::JobAssign { seq, .. }
            | Envelope::JobAck { seq, .. }
            | Envelope::JobResult { seq, .. }
            | Envelope::ServerShutdown { seq, .. } => *seq,
        }
    }

    pub fn ack_seq(&self) -> u64 {
        match self {
            Envelope::Hello { ack_seq, .. }
            | Envelope::HelloAck { ack_seq, .. }
            | Envelope::Heartbeat { ack_seq, .. }
            | Envelope::HeartbeatAck { ack_seq, .. }
            | Envelope::JobAssign { ack_seq, .. }
            | Envelope::JobAck { ack_seq, .. }
            | Envelope::JobResult { ack_seq, .. }
            | Envelope::ServerShutdown { ack_seq, .. } => *ack_seq,
        }
    }

    pub fn ts(&self) -> i64 {
        match self {
            Envelope::Hello { ts, .. }
            | Envelope::HelloAck { ts, .. }
            | Envelope::Heartbeat { ts, .. }
            | Envelope::HeartbeatAck { ts, .. }
            | Envelope::JobAssign { ts, .. }
            | Envelope::JobAck { ts, .. }
            | Envelope::JobResult { ts, .. }
            | Envelope::ServerShutdown { ts, .. } => *ts,
        }
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
