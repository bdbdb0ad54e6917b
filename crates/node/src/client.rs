// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Session Client (spec §4.5): owns the outbound connection to the
//! gateway and drives it through `disconnected -> connecting -> handshaking
//! -> online -> disconnected`, reconnecting with exponential backoff
//! whenever the transport drops. The Executor and the vendor adapter
//! outlive any one connection; the Heartbeat Emitter, the outbound channel,
//! and the sequence counter are rebuilt fresh on every `online` entry (spec
//! §4.5 "Reconnect ownership graph").

use crate::backoff::Backoff;
use crate::error::NodeError;
use crate::executor::Executor;
use crate::heartbeat::HeartbeatEmitter;
use crate::outbound::{self, OutboundHandle, OutboundMsg};
use crate::seq::ConnectionSeq;
use crate::vendor::VendorClient;
use dfc_core::{Clock, NodeId};
use dfc_wire::{Envelope, HelloPayload};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const HELLO_ACK_DEADLINE: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(20);
const PONG_DEADLINE: Duration = Duration::from_secs(10);
const PROTOCOL_VERSION: &str = "1";

type NodeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct SessionClient<C: Clock + 'static> {
    node_id: NodeId,
    gateway_url: String,
    clock: C,
    heartbeat_interval: Duration,
    executor: Arc<Executor<C>>,
    vendor: Arc<VendorClient>,
}

impl<C: Clock + 'static> SessionClient<C> {
    pub fn new(
        node_id: NodeId,
        gateway_url: String,
        clock: C,
        executor: Arc<Executor<C>>,
        vendor: Arc<VendorClient>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self { node_id, gateway_url, clock, heartbeat_interval, executor, vendor }
    }

    /// Runs forever, reconnecting on every failure, until `stop` fires.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        let mut backoff = Backoff::new();
        while !*stop.borrow() {
            match self.connect_and_serve(stop.clone()).await {
                Ok(()) => backoff.reset(),
                Err(e) => warn!(node_id = %self.node_id, error = %e, "session ended, will reconnect"),
            }
            if *stop.borrow() {
                break;
            }
            let delay = backoff.next_delay();
            info!(node_id = %self.node_id, ?delay, "retrying connection after backoff");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stop.changed() => {}
            }
        }
        info!(node_id = %self.node_id, "session client stopped");
    }

    async fn connect_and_serve(&self, stop: watch::Receiver<bool>) -> Result<(), NodeError> {
        info!(node_id = %self.node_id, url = %self.gateway_url, "connecting to gateway");
        let (socket, _response) = tokio_tungstenite::connect_async(&self.gateway_url)
            .await
            .map_err(|e| NodeError::Transport(e.to_string()))?;
        let (mut sink, mut stream) = socket.split();

        let seq = Arc::new(Mutex::new(ConnectionSeq::new()));
        self.handshake(&mut sink, &mut stream, &seq).await?;
        info!(node_id = %self.node_id, "session established");

        let (outbound, out_rx) = outbound::channel();
        let writer = tokio::spawn(run_writer(sink, out_rx, self.node_id.clone()));

        let (hb_stop_tx, hb_stop_rx) = watch::channel(false);
        let heartbeat_task = {
            let emitter =
                HeartbeatEmitter::new(self.node_id.clone(), self.clock.clone(), self.vendor.clone(), self.heartbeat_interval);
            let outbound = outbound.clone();
            let seq = seq.clone();
            tokio::spawn(async move { emitter.run(outbound, seq, hb_stop_rx).await })
        };

        let result = self.read_loop(&mut stream, &outbound, &seq, stop).await;

        let _ = hb_stop_tx.send(true);
        let _ = heartbeat_task.await;
        let _ = outbound.close();
        writer.abort();
        result
    }

    async fn handshake(
        &self,
        sink: &mut SplitSink<NodeSocket, Message>,
        stream: &mut SplitStream<NodeSocket>,
        seq: &Arc<Mutex<ConnectionSeq>>,
    ) -> Result<(), NodeError> {
        let hello = Envelope::Hello {
            node_id: self.node_id.clone(),
            ts: self.clock.epoch_ms() as i64 / 1000,
            seq: seq.lock().next_send(),
            ack_seq: 0,
            payload: HelloPayload {
                version: PROTOCOL_VERSION.to_string(),
                capabilities: Vec::new(),
                last_job_result_seq: 0,
            },
        };
        let text = dfc_wire::encode(&hello).map_err(NodeError::Protocol)?;
        sink.send(Message::Text(text)).await.map_err(|e| NodeError::Transport(e.to_string()))?;

        match tokio::time::timeout(HELLO_ACK_DEADLINE, stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => match dfc_wire::decode(&text) {
                Ok(Envelope::HelloAck { .. }) => Ok(()),
                Ok(_other) => Err(NodeError::HandshakeTimeout),
                Err(e) => Err(NodeError::Protocol(e)),
            },
            Ok(Some(Ok(_other))) => Err(NodeError::HandshakeTimeout),
            Ok(Some(Err(e))) => Err(NodeError::Transport(e.to_string())),
            Ok(None) => Err(NodeError::Transport("transport closed during handshake".to_string())),
            Err(_elapsed) => Err(NodeError::HandshakeTimeout),
        }
    }

    async fn read_loop(
        &self,
        stream: &mut SplitStream<NodeSocket>,
        outbound: &OutboundHandle,
        seq: &Arc<Mutex<ConnectionSeq>>,
        mut stop: watch::Receiver<bool>,
    ) -> Result<(), NodeError> {
        let mut last_pong = tokio::time::Instant::now();
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(last_pong + PONG_DEADLINE) => {
                    return Err(NodeError::PongTimeout);
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        let _ = outbound.close();
                        return Ok(());
                    }
                }
                incoming = stream.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            last_pong = tokio::time::Instant::now();
                            self.dispatch(&text, outbound, seq);
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                            last_pong = tokio::time::Instant::now();
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!(node_id = %self.node_id, "transport closed by gateway");
                            return Ok(());
                        }
                        Some(Ok(_other)) => {}
                        Some(Err(e)) => return Err(NodeError::Transport(e.to_string())),
                    }
                }
            }
        }
    }

    fn dispatch(&self, text: &str, outbound: &OutboundHandle, seq: &Arc<Mutex<ConnectionSeq>>) {
        let envelope = match dfc_wire::decode(text) {
            Ok(e) => e,
            Err(e) => {
                warn!(node_id = %self.node_id, error = %e, "ignoring malformed frame");
                return;
            }
        };

        if let dfc_core::session::SeqObservation::Gap { expected, observed } = seq.lock().observe_recv(envelope.seq()) {
            warn!(node_id = %self.node_id, expected, observed, "sequence gap on inbound frame");
        }

        match envelope {
            Envelope::HeartbeatAck { .. } => {}
            Envelope::JobAssign { payload, .. } => {
                self.executor.handle_assign(payload, outbound.clone(), seq.clone());
            }
            Envelope::ServerShutdown { .. } => {
                info!(node_id = %self.node_id, "server shutdown received");
                let _ = outbound.close();
            }
            other => {
                debug!(node_id = %self.node_id, kind = %other.kind(), "ignoring unexpected message type from gateway");
            }
        }
    }
}

/// The node's half of the single-writer rule: the only task that ever
/// calls `sink.send` for this connection, so heartbeats, job acks, and
/// results never interleave on the wire (spec §5).
async fn run_writer(mut sink: SplitSink<NodeSocket, Message>, mut out_rx: mpsc::UnboundedReceiver<OutboundMsg>, node_id: NodeId) {
    let mut ping_tick = tokio::time::interval(PING_INTERVAL);
    ping_tick.tick().await;
    loop {
        tokio::select! {
            _ = ping_tick.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            msg = out_rx.recv() => {
                let Some(msg) = msg else { break };
                let outcome = match msg {
                    OutboundMsg::Frame(envelope) => match dfc_wire::encode(&envelope) {
                        Ok(text) => sink.send(Message::Text(text)).await,
                        Err(e) => {
                            warn!(%node_id, error = %e, "failed to encode outbound frame");
                            continue;
                        }
                    },
                    OutboundMsg::Close => {
                        let _ = sink.send(Message::Close(None)).await;
                        break;
                    }
                };
                if outcome.is_err() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
