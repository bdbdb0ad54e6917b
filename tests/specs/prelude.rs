// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared black-box test harness: spawns the real `dfc-orchestratord` /
//! `dfc-noded` / `dfc` binaries as child processes and speaks the wire
//! protocol directly wherever a spec scenario needs a fake peer (a node
//! faking HELLO/HEARTBEAT/JOB_ACK/JOB_RESULT against a real orchestrator,
//! or a fake gateway faking the orchestrator's half against a real node).

#![allow(dead_code)]

pub use dfc_core::{Action, ActionParams, JobAckState, JobId, JobResultState, NodeId};
pub use dfc_wire::{
    Envelope, HeartbeatPayload, HelloAckPayload, HelloPayload, JobAckPayload, JobAssignPayload,
    JobResultPayload, Metrics,
};

use futures_util::{SinkExt, StreamExt};
use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::process::{Child, Command as StdCommand, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Generous ceiling for "should happen soon" assertions; most resolve far
/// sooner, but CI machines are slow and the sweeper ticks on a 10s cadence.
pub const SPEC_WAIT_MAX_MS: u64 = 5_000;

/// Poll a synchronous condition every 20ms until it's true or we time out.
pub fn wait_for(timeout_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if cond() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Poll an async condition every 50ms until it's true or we time out; for
/// specs that need to re-issue a REST call (or similar) inside the wait.
pub async fn wait_for_async<F, Fut>(timeout_ms: u64, mut cond: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if cond().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

fn target_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CARGO_TARGET_DIR") {
        return PathBuf::from(dir);
    }
    workspace_root().join("target")
}

/// Locates a workspace binary's build artifact directly. `assert_cmd`'s own
/// `cargo_bin` only resolves binaries owned by the crate under test (via
/// `CARGO_BIN_EXE_*`), and every binary exercised here — `dfc-orchestratord`,
/// `dfc-noded`, `dfc` — lives in a different workspace member than this
/// root spec crate.
pub fn bin_path(name: &str) -> PathBuf {
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    let mut path = target_dir().join(profile).join(name);
    if cfg!(windows) {
        path.set_extension("exe");
    }
    path
}

pub fn dfc_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(bin_path("dfc"))
}

/// A free localhost TCP port, found by binding to port 0 and releasing it
/// immediately. Racy in theory; good enough for local, single-host specs.
pub fn free_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0").expect("bind ephemeral port").local_addr().expect("local_addr").port()
}

/// One running `dfc-orchestratord` child process bound to a scratch port.
pub struct OrchestratorProcess {
    child: Child,
    pub addr: String,
}

impl OrchestratorProcess {
    pub fn start() -> Self {
        let port = free_port();
        let addr = format!("127.0.0.1:{port}");
        let child = StdCommand::new(bin_path("dfc-orchestratord"))
            .env("DFC_LISTEN_ADDR", &addr)
            .env("RUST_LOG", "error")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn dfc-orchestratord");
        let this = Self { child, addr };
        let ready = wait_for(SPEC_WAIT_MAX_MS, || std::net::TcpStream::connect(&this.addr).is_ok());
        assert!(ready, "orchestrator did not start listening in time");
        this
    }

    /// Start with a shortened heartbeat timeout / sweep interval, for specs
    /// that exercise the policy engine without a multi-second real sleep.
    pub fn start_with_fast_sweep(heartbeat_timeout_secs: u64, sweep_interval_secs: u64) -> Self {
        let port = free_port();
        let addr = format!("127.0.0.1:{port}");
        let child = StdCommand::new(bin_path("dfc-orchestratord"))
            .env("DFC_LISTEN_ADDR", &addr)
            .env("DFC_HEARTBEAT_TIMEOUT_SECS", heartbeat_timeout_secs.to_string())
            .env("DFC_SWEEP_INTERVAL_SECS", sweep_interval_secs.to_string())
            .env("RUST_LOG", "error")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn dfc-orchestratord");
        let this = Self { child, addr };
        let ready = wait_for(SPEC_WAIT_MAX_MS, || std::net::TcpStream::connect(&this.addr).is_ok());
        assert!(ready, "orchestrator did not start listening in time");
        this
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for OrchestratorProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// One running `dfc-noded` child process pointed at a gateway URL and a
/// vendor daemon URL the spec controls.
pub struct NodeProcess {
    child: Child,
}

impl NodeProcess {
    pub fn start(node_id: &str, gateway_url: &str, laixi_ws_url: &str) -> Self {
        let child = StdCommand::new(bin_path("dfc-noded"))
            .env("NODE_ID", node_id)
            .env("GATEWAY_URL", gateway_url)
            .env("LAIXI_WS_URL", laixi_ws_url)
            .env("RUST_LOG", "error")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn dfc-noded");
        Self { child }
    }
}

impl Drop for NodeProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// A fake vendor daemon: accepts any number of WS connections and answers
/// every `{"cmd": ..., "params": ...}` request with `{"result": {"echo": cmd}}`.
pub struct FakeVendor {
    pub url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeVendor {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind vendor listener");
        let addr = listener.local_addr().expect("local_addr");
        let url = format!("ws://{addr}");
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { break };
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else { return };
                    while let Some(Ok(msg)) = ws.next().await {
                        if let Message::Text(text) = msg {
                            let req: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
                            let cmd = req.get("cmd").and_then(|v| v.as_str()).unwrap_or("").to_string();
                            let reply = serde_json::json!({ "result": { "echo": cmd } });
                            if ws.send(Message::Text(reply.to_string())).await.is_err() {
                                break;
                            }
                        }
                    }
                });
            }
        });
        Self { url, handle }
    }
}

impl Drop for FakeVendor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A fake peer on one end of the wire protocol: either a fake node talking
/// to a real orchestrator, or a fake gateway talking to a real node. Both
/// roles share the same frame vocabulary, so one generic struct covers
/// both directions of spec §6.
pub struct Peer<S> {
    ws: WebSocketStream<S>,
    node_id: String,
    send_seq: u64,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Peer<S> {
    fn new(ws: WebSocketStream<S>) -> Self {
        Self { ws, node_id: String::new(), send_seq: 0 }
    }

    fn next_seq(&mut self) -> u64 {
        self.send_seq += 1;
        self.send_seq
    }

    /// Sets this peer's claimed node-id without sending a HELLO frame, for
    /// specs that need to send a non-HELLO frame first (protocol-violation
    /// scenarios).
    pub fn set_node_id(&mut self, node_id: &str) {
        self.node_id = node_id.to_string();
    }

    pub async fn send(&mut self, envelope: Envelope) {
        let text = dfc_wire::encode(&envelope).expect("encode envelope");
        self.ws.send(Message::Text(text)).await.expect("send frame");
    }

    pub async fn recv(&mut self) -> Envelope {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return dfc_wire::decode(&text).expect("decode frame"),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(other)) => panic!("unexpected non-text frame: {other:?}"),
                Some(Err(e)) => panic!("transport error awaiting a frame: {e}"),
                None => panic!("transport closed while awaiting a frame"),
            }
        }
    }

    pub async fn recv_timeout(&mut self, ms: u64) -> Option<Envelope> {
        tokio::time::timeout(Duration::from_millis(ms), self.recv()).await.ok()
    }

    // --- node-playing-role helpers: HELLO / HEARTBEAT / JOB_ACK / JOB_RESULT ---

    pub async fn hello(&mut self, node_id: &str) {
        self.node_id = node_id.to_string();
        let envelope = Envelope::Hello {
            node_id: NodeId::new(node_id),
            ts: 0,
            seq: self.next_seq(),
            ack_seq: 0,
            payload: HelloPayload { version: "1".to_string(), capabilities: vec!["adb".to_string()], last_job_result_seq: 0 },
        };
        self.send(envelope).await;
    }

    pub async fn expect_hello_ack(&mut self) -> HelloAckPayload {
        match self.recv().await {
            Envelope::HelloAck { payload, .. } => payload,
            other => panic!("expected HELLO_ACK, got {other:?}"),
        }
    }

    pub async fn send_heartbeat(&mut self, health: HeartbeatPayload) {
        let envelope = Envelope::Heartbeat {
            node_id: NodeId::new(self.node_id.clone()),
            ts: 0,
            seq: self.next_seq(),
            ack_seq: 0,
            payload: health,
        };
        self.send(envelope).await;
    }

    pub async fn expect_job_assign(&mut self) -> JobAssignPayload {
        match self.recv().await {
            Envelope::JobAssign { payload, .. } => payload,
            other => panic!("expected JOB_ASSIGN, got {other:?}"),
        }
    }

    pub async fn expect_job_assign_timeout(&mut self, ms: u64) -> Option<JobAssignPayload> {
        match self.recv_timeout(ms).await {
            Some(Envelope::JobAssign { payload, .. }) => Some(payload),
            Some(other) => panic!("expected JOB_ASSIGN, got {other:?}"),
            None => None,
        }
    }

    pub async fn ack_job(&mut self, job_id: JobId, state: JobAckState) {
        let envelope = Envelope::JobAck {
            node_id: NodeId::new(self.node_id.clone()),
            ts: 0,
            seq: self.next_seq(),
            ack_seq: 0,
            payload: JobAckPayload { job_id, state },
        };
        self.send(envelope).await;
    }

    pub async fn result_job(&mut self, job_id: JobId, state: JobResultState, metrics: Metrics, error: Option<String>) {
        let envelope = Envelope::JobResult {
            node_id: NodeId::new(self.node_id.clone()),
            ts: 0,
            seq: self.next_seq(),
            ack_seq: 0,
            payload: JobResultPayload { job_id, state, metrics, error },
        };
        self.send(envelope).await;
    }

    // --- gateway-playing-role helpers: HELLO_ACK / JOB_ASSIGN ---

    pub async fn expect_hello(&mut self) -> HelloPayload {
        match self.recv().await {
            Envelope::Hello { node_id, payload, .. } => {
                self.node_id = node_id.to_string();
                payload
            }
            other => panic!("expected HELLO, got {other:?}"),
        }
    }

    pub async fn send_hello_ack(&mut self) {
        let envelope = Envelope::HelloAck {
            node_id: NodeId::new(self.node_id.clone()),
            ts: 0,
            seq: self.next_seq(),
            ack_seq: 0,
            payload: HelloAckPayload { server_time: "2026-07-28T00:00:00Z".to_string() },
        };
        self.send(envelope).await;
    }

    pub async fn send_job_assign(
        &mut self,
        job_id: JobId,
        action: Action,
        params: ActionParams,
        device_ids: Vec<String>,
        idempotency_key: &str,
    ) {
        let envelope = Envelope::JobAssign {
            node_id: NodeId::new(self.node_id.clone()),
            ts: 0,
            seq: self.next_seq(),
            ack_seq: 0,
            payload: JobAssignPayload { job_id, action, params, device_ids, idempotency_key: idempotency_key.to_string() },
        };
        self.send(envelope).await;
    }

    pub async fn expect_job_ack(&mut self) -> JobAckPayload {
        match self.recv().await {
            Envelope::JobAck { payload, .. } => payload,
            other => panic!("expected JOB_ACK, got {other:?}"),
        }
    }

    pub async fn expect_job_result_timeout(&mut self, ms: u64) -> Option<JobResultPayload> {
        match self.recv_timeout(ms).await {
            Some(Envelope::JobResult { payload, .. }) => Some(payload),
            Some(other) => panic!("expected JOB_RESULT, got {other:?}"),
            None => None,
        }
    }
}

pub type FakeNode = Peer<MaybeTlsStream<TcpStream>>;
pub type GatewayConn = Peer<TcpStream>;

/// Dials a real orchestrator's `/ws` route, playing the node's half of the
/// handshake.
pub async fn connect_fake_node(ws_url: &str) -> FakeNode {
    let (ws, _response) = tokio_tungstenite::connect_async(ws_url).await.expect("connect to orchestrator");
    Peer::new(ws)
}

/// A bound-but-not-yet-accepting fake gateway listener, handed to a real
/// `dfc-noded` via `GATEWAY_URL` before the spec calls `accept`.
pub async fn bind_fake_gateway() -> (String, TcpListener) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind gateway listener");
    let addr = listener.local_addr().expect("local_addr");
    (format!("ws://{addr}/ws", addr = addr), listener)
}

pub async fn accept_gateway_conn(listener: TcpListener) -> GatewayConn {
    let (stream, _peer) = listener.accept().await.expect("accept node connection");
    let ws = tokio_tungstenite::accept_async(stream).await.expect("ws handshake with node");
    Peer::new(ws)
}
