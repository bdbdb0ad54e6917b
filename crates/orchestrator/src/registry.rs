// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Registry (spec §3, §4.2, §4.3): node-id → live session, enforcing
//! single-active-session per node-id.
//!
//! Locking follows spec §5: a `parking_lot::RwLock` guards only the map and
//! its small `Session` payloads, never held across I/O. Sending a frame is
//! two steps — `prepare_send` takes the lock just long enough to allocate a
//! sequence number and clone the outbound handle, then the caller writes to
//! the (lock-free) handle outside the lock.

use dfc_core::{Clock, HealthSample, NodeId, Session, SessionStatus};
use dfc_wire::Envelope;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One frame (or a close directive) destined for a connection's writer
/// task. The writer task is the single writer for its socket (spec §5); the
/// rest of the process only ever touches this channel.
#[derive(Debug, Clone)]
pub enum OutboundMsg {
    Frame(Envelope),
    Close(dfc_wire::CloseReason),
}

/// A cheap, cloneable handle to a connection's serialized writer task.
#[derive(Clone)]
pub struct OutboundHandle(mpsc::UnboundedSender<OutboundMsg>);

impl OutboundHandle {
    pub fn new(sender: mpsc::UnboundedSender<OutboundMsg>) -> Self {
        Self(sender)
    }

    /// Enqueue a frame for the writer task. Fails only once the writer task
    /// (and therefore the socket) is gone.
    pub fn send(&self, envelope: Envelope) -> Result<(), Closed> {
        self.0.send(OutboundMsg::Frame(envelope)).map_err(|_| Closed)
    }

    pub fn close(&self, reason: dfc_wire::CloseReason) -> Result<(), Closed> {
        self.0.send(OutboundMsg::Close(reason)).map_err(|_| Closed)
    }
}

/// The writer task (or its socket) has already gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("outbound channel closed")]
pub struct Closed;

struct SessionEntry {
    session: Session,
    outbound: OutboundHandle,
    /// Monotonically increasing per node-id; lets a disconnecting task tell
    /// whether it's still the *current* occupant before removing itself
    /// from the map, so a stale close doesn't clobber a session that has
    /// since been replaced by a fresh HELLO.
    epoch: u64,
}

/// A read-only snapshot of one session, cheap to clone for REST responses.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub node_id: NodeId,
    pub status: SessionStatus,
    pub connected_at_epoch_ms: u64,
    pub last_heartbeat_epoch_ms: u64,
    pub health: HealthSample,
}

/// Outcome of installing a session for a HELLO (spec §4.2 steps 1-3).
pub struct InstallOutcome {
    pub epoch: u64,
    /// The outbound handle of the session this HELLO displaced, if any. The
    /// caller sends SERVER_SHUTDOWN to it and closes it (spec §4.2 step 2).
    pub replaced: Option<OutboundHandle>,
}

pub struct Registry<C: Clock> {
    clock: C,
    inner: RwLock<HashMap<NodeId, SessionEntry>>,
    next_epoch: AtomicU64,
}

impl<C: Clock> Registry<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, inner: RwLock::new(HashMap::new()), next_epoch: AtomicU64::new(1) }
    }

    /// Install a freshly handshaken session, replacing any prior occupant
    /// for this node-id (spec §4.2 steps 1-3, invariant: uniqueness).
    pub fn install_session(
        &self,
        node_id: NodeId,
        hello_seq: u64,
        outbound: OutboundHandle,
    ) -> InstallOutcome {
        let session = Session::new(node_id.clone(), hello_seq, &self.clock);
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);
        let mut inner = self.inner.write();
        let replaced = inner
            .insert(node_id, SessionEntry { session, outbound, epoch })
            .map(|prev| prev.outbound);
        InstallOutcome { epoch, replaced }
    }

    /// Remove a session, but only if `epoch` still matches the live
    /// occupant — guards against a stale disconnect handler racing a
    /// just-installed replacement session (spec §4.2).
    pub fn remove_if_current(&self, node_id: &NodeId, epoch: u64) -> bool {
        let mut inner = self.inner.write();
        if inner.get(node_id).is_some_and(|e| e.epoch == epoch) {
            inner.remove(node_id);
            true
        } else {
            false
        }
    }

    /// Allocate the next outbound sequence number for `node_id` and clone
    /// its writer handle, without holding the lock across any I/O.
    pub fn prepare_send(&self, node_id: &NodeId) -> Option<(OutboundHandle, u64)> {
        let mut inner = self.inner.write();
        let entry = inner.get_mut(node_id)?;
        let seq = entry.session.next_send_seq();
        Some((entry.outbound.clone(), seq))
    }

    /// Record an inbound HEARTBEAT, returning the previous health sample so
    /// the caller can run device-drop detection (spec §4.3).
    pub fn record_heartbeat(&self, node_id: &NodeId, health: HealthSample) -> Option<HealthSample> {
        let mut inner = self.inner.write();
        let entry = inner.get_mut(node_id)?;
        Some(entry.session.record_heartbeat(health, &self.clock))
    }

    /// Record an inbound message's `seq`, tolerating gaps (spec §5).
    pub fn observe_recv_seq(
        &self,
        node_id: &NodeId,
        seq: u64,
    ) -> Option<dfc_core::session::SeqObservation> {
        let mut inner = self.inner.write();
        let entry = inner.get_mut(node_id)?;
        Some(entry.session.observe_recv_seq(seq))
    }

    /// All sessions whose heartbeat has gone stale past `timeout` and that
    /// are still marked online; flips them offline and returns their
    /// node-ids so the caller can enqueue recovery directives (spec §4.3).
    /// Offline sessions are left in the map (spec: they persist for reuse).
    pub fn sweep_timeouts(&self, timeout: Duration) -> Vec<NodeId> {
        let mut inner = self.inner.write();
        let mut newly_offline = Vec::new();
        for (node_id, entry) in inner.iter_mut() {
            if entry.session.status == SessionStatus::Online
                && entry.session.is_heartbeat_stale(timeout, &self.clock)
            {
                entry.session.mark_offline();
                newly_offline.push(node_id.clone());
            }
        }
        newly_offline
    }

    /// Whether `node_id` has a live session currently marked online. New
    /// job submissions must fail fast against an offline session even
    /// though its outbound handle is still technically reachable (spec §8
    /// scenario 3) — a recovery directive is the one thing allowed to
    /// reach it anyway, via [`Self::prepare_send`] directly.
    pub fn is_online(&self, node_id: &NodeId) -> bool {
        self.inner.read().get(node_id).is_some_and(|e| e.session.status == SessionStatus::Online)
    }

    pub fn snapshot(&self, node_id: &NodeId) -> Option<NodeSnapshot> {
        self.inner.read().get(node_id).map(|e| to_snapshot(node_id, &e.session))
    }

    pub fn list(&self) -> Vec<NodeSnapshot> {
        self.inner.read().iter().map(|(id, e)| to_snapshot(id, &e.session)).collect()
    }

    /// Every live session's node-id and outbound handle, for orderly
    /// shutdown broadcast.
    pub fn all_outbound(&self) -> Vec<(NodeId, OutboundHandle)> {
        self.inner.read().iter().map(|(id, e)| (id.clone(), e.outbound.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn to_snapshot(node_id: &NodeId, session: &Session) -> NodeSnapshot {
    NodeSnapshot {
        node_id: node_id.clone(),
        status: session.status,
        connected_at_epoch_ms: session.connected_at_epoch_ms,
        last_heartbeat_epoch_ms: session.last_heartbeat_epoch_ms,
        health: session.health.clone(),
    }
}

/// Convenience alias used by callers that need a shared registry handle.
pub type SharedRegistry<C> = Arc<Registry<C>>;

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
