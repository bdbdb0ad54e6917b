// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The node side of the single-writer rule (spec §4.5, §5): "outgoing
//! writes are serialized (the transport is single-writer from the node
//! side)". Mirrors `dfc-orchestrator`'s `registry::OutboundHandle` —
//! everything that wants to send a frame to the gateway (the heartbeat
//! emitter, the executor acking/reporting a job) goes through this cheap,
//! cloneable channel instead of touching the socket directly.

use dfc_wire::Envelope;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum OutboundMsg {
    Frame(Envelope),
    Close,
}

#[derive(Clone)]
pub struct OutboundHandle(mpsc::UnboundedSender<OutboundMsg>);

/// The writer task (and therefore the socket) has already gone away; the
/// caller's send was a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("outbound channel closed")]
pub struct Closed;

impl OutboundHandle {
    pub fn new(sender: mpsc::UnboundedSender<OutboundMsg>) -> Self {
        Self(sender)
    }

    pub fn send(&self, envelope: Envelope) -> Result<(), Closed> {
        self.0.send(OutboundMsg::Frame(envelope)).map_err(|_| Closed)
    }

    pub fn close(&self) -> Result<(), Closed> {
        self.0.send(OutboundMsg::Close).map_err(|_| Closed)
    }
}

pub fn channel() -> (OutboundHandle, mpsc::UnboundedReceiver<OutboundMsg>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutboundHandle::new(tx), rx)
}
