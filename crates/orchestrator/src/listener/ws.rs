// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket upgrade and per-connection handling (spec §4.1, §4.2): the
//! HELLO handshake, the ping/pong watchdog, and dispatch of inbound
//! HEARTBEAT/JOB_ACK/JOB_RESULT frames for one node's session.

use super::AppState;
use crate::job_table::JobOutcome;
use crate::registry::{InstallOutcome, OutboundHandle, OutboundMsg};
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use dfc_core::{Clock, HealthSample, NodeId};
use dfc_wire::{CloseReason, Envelope};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const HELLO_DEADLINE: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(20);
const PONG_DEADLINE: Duration = Duration::from_secs(10);

pub async fn upgrade<C: Clock + 'static>(
    State(state): State<AppState<C>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket<C: Clock + 'static>(state: AppState<C>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();

    let hello = match tokio::time::timeout(HELLO_DEADLINE, stream.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => match dfc_wire::decode(&text) {
            Ok(Envelope::Hello { node_id, seq, payload, .. }) => (node_id, seq, payload),
            Ok(_other) => {
                warn!("expected HELLO, got a different message type");
                let _ = close(&mut sink, CloseReason::ExpectedHello).await;
                return;
            }
            Err(e) => {
                warn!(error = %e, "malformed HELLO");
                let _ = close(&mut sink, CloseReason::ExpectedHello).await;
                return;
            }
        },
        Ok(Some(Ok(_other))) => {
            warn!("expected a HELLO text frame");
            let _ = close(&mut sink, CloseReason::ExpectedHello).await;
            return;
        }
        Ok(Some(Err(e))) => {
            warn!(error = %e, "transport error awaiting HELLO");
            return;
        }
        Ok(None) => {
            warn!("transport closed awaiting HELLO");
            return;
        }
        Err(_elapsed) => {
            warn!("HELLO not received within deadline");
            let _ = close(&mut sink, CloseReason::HelloTimeout).await;
            return;
        }
    };

    let (node_id, hello_seq, _hello_payload) = hello;
    if node_id.as_str().is_empty() {
        warn!("HELLO carried an empty node_id");
        let _ = close(&mut sink, CloseReason::MissingNodeId).await;
        return;
    }

    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMsg>();
    let InstallOutcome { epoch, replaced } =
        state.registry.install_session(node_id.clone(), hello_seq, OutboundHandle::new(out_tx));

    if let Some(prev) = replaced {
        info!(%node_id, "HELLO replaced an existing session");
        let now = state.clock.epoch_ms() as i64 / 1000;
        let _ = prev.send(Envelope::ServerShutdown { node_id: node_id.clone(), ts: now, seq: 0, ack_seq: 0 });
        let _ = prev.close(CloseReason::Normal);
    }

    let server_time = chrono::Utc::now().to_rfc3339();
    let ack = Envelope::HelloAck {
        node_id: node_id.clone(),
        ts: state.clock.epoch_ms() as i64 / 1000,
        seq: hello_seq,
        ack_seq: hello_seq,
        payload: dfc_wire::HelloAckPayload { server_time },
    };
    let Ok(text) = dfc_wire::encode(&ack) else {
        warn!(%node_id, "failed to encode HELLO_ACK");
        return;
    };
    if sink.send(Message::Text(text)).await.is_err() {
        warn!(%node_id, "failed to send HELLO_ACK");
        return;
    }
    info!(%node_id, "session established");

    let writer = tokio::spawn(run_writer(sink, out_rx, node_id.clone()));

    let mut last_pong = tokio::time::Instant::now();
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(last_pong + PONG_DEADLINE) => {
                warn!(%node_id, "pong deadline exceeded, closing transport");
                break;
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        last_pong = tokio::time::Instant::now();
                        dispatch(&state, &node_id, &text);
                    }
                    Some(Ok(Message::Pong(_) | Message::Ping(_))) => {
                        last_pong = tokio::time::Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(%node_id, "transport closed by peer");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(%node_id, "ignoring unexpected binary frame");
                    }
                    Some(Err(e)) => {
                        warn!(%node_id, error = %e, "transport error");
                        break;
                    }
                }
            }
        }
    }

    state.registry.remove_if_current(&node_id, epoch);
    writer.abort();
    info!(%node_id, "session torn down");
}

/// The serialized writer for one connection: drains `out_rx` onto the
/// socket and is the only task that ever calls `sink.send` for it, so
/// frames from the registry, the router, and the ping ticker never
/// interleave (spec §5).
async fn run_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut out_rx: mpsc::UnboundedReceiver<OutboundMsg>,
    node_id: NodeId,
) {
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
                    OutboundMsg::Close(reason) => {
                        let _ = sink
                            .send(Message::Close(Some(CloseFrame {
                                code: reason.code(),
                                reason: reason.description().into(),
                            })))
                            .await;
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

fn dispatch<C: Clock + 'static>(state: &AppState<C>, node_id: &NodeId, text: &str) {
    let envelope = match dfc_wire::decode(text) {
        Ok(e) => e,
        Err(e) => {
            warn!(%node_id, error = %e, "ignoring malformed frame");
            return;
        }
    };

    if let Some(observation) = state.registry.observe_recv_seq(node_id, envelope.seq()) {
        if let dfc_core::session::SeqObservation::Gap { expected, observed } = observation {
            warn!(%node_id, expected, observed, "sequence gap on inbound frame");
        }
    }

    match envelope {
        Envelope::Heartbeat { payload, .. } => {
            let sample: HealthSample = payload.into();
            if let Some(prev) = state.registry.record_heartbeat(node_id, sample.clone()) {
                state.policy.check_device_drop(node_id, &prev, &sample);
            }
        }
        Envelope::JobAck { payload, .. } => {
            let delivered =
                state.job_table.resolve_ack(payload.job_id, payload.state, state.clock.epoch_ms());
            if !delivered {
                debug!(%node_id, job_id = %payload.job_id, "JOB_ACK for unknown or already-resolved job");
            }
        }
        Envelope::JobResult { payload, .. } => {
            let outcome =
                JobOutcome { state: payload.state, metrics: payload.metrics, error: payload.error };
            let delivered = state.job_table.resolve_result(payload.job_id, outcome, state.clock.epoch_ms());
            if !delivered {
                warn!(%node_id, job_id = %payload.job_id, "late or unmatched JOB_RESULT dropped");
            }
        }
        other => {
            debug!(%node_id, kind = %other.kind(), "ignoring unexpected message type from node");
        }
    }
}

async fn close(
    sink: &mut SplitSink<WebSocket, Message>,
    reason: CloseReason,
) -> Result<(), axum::Error> {
    sink.send(Message::Close(Some(CloseFrame { code: reason.code(), reason: reason.description().into() })))
        .await
}
