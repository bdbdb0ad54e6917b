// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The vendor-daemon adapter (spec §4.7, §5): "the adapter is invoked
//! through a mutex-guarded client handle" so two workers never interleave
//! requests on the shared local connection. One `VendorClient` per node,
//! shared by every job worker and the heartbeat emitter.

use crate::error::NodeError;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

type VendorSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Single exclusion guard around one persistent connection to the vendor
/// daemon. `call` reconnects lazily: a dropped connection is only noticed
/// (and repaired) the next time something wants to use it.
pub struct VendorClient {
    url: String,
    conn: Mutex<Option<VendorSocket>>,
}

impl VendorClient {
    pub fn new(url: String) -> Self {
        Self { url, conn: Mutex::new(None) }
    }

    /// Issue one request-reply exchange with the vendor daemon, reconnecting
    /// first if there is no live connection.
    pub async fn call(&self, verb: &str, params: Value) -> Result<Value, NodeError> {
        tokio::time::timeout(COMMAND_TIMEOUT, self.call_inner(verb, params))
            .await
            .map_err(|_| NodeError::VendorTimeout(COMMAND_TIMEOUT))?
    }

    async fn call_inner(&self, verb: &str, params: Value) -> Result<Value, NodeError> {
        let mut guard = self.conn.lock().await;
        let socket = self.ensure_connected(&mut guard).await?;

        let request = serde_json::json!({ "cmd": verb, "params": params });
        let text = serde_json::to_string(&request)
            .map_err(|e| NodeError::VendorError(format!("encoding request: {e}")))?;
        if socket.send(Message::Text(text)).await.is_err() {
            *guard = None;
            return Err(NodeError::VendorUnreachable(self.url.clone()));
        }

        loop {
            match socket.next().await {
                Some(Ok(Message::Text(text))) => {
                    let reply: Value = serde_json::from_str(&text)
                        .map_err(|e| NodeError::VendorError(format!("decoding reply: {e}")))?;
                    if let Some(error) = reply.get("error").and_then(Value::as_str) {
                        return Err(NodeError::VendorError(error.to_string()));
                    }
                    return Ok(reply.get("result").cloned().unwrap_or(Value::Null));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(_other)) => continue,
                Some(Err(e)) => {
                    *guard = None;
                    return Err(NodeError::Transport(e.to_string()));
                }
                None => {
                    *guard = None;
                    return Err(NodeError::VendorUnreachable(self.url.clone()));
                }
            }
        }
    }

    async fn ensure_connected<'a>(&self, guard: &'a mut Option<VendorSocket>) -> Result<&'a mut VendorSocket, NodeError> {
        if guard.is_none() {
            let (socket, _response) = tokio_tungstenite::connect_async(&self.url)
                .await
                .map_err(|e| NodeError::VendorUnreachable(e.to_string()))?;
            *guard = Some(socket);
        }
        guard.as_mut().ok_or_else(|| NodeError::VendorUnreachable(self.url.clone()))
    }

    /// Drop the current connection so the next `call` reconnects from
    /// scratch. Used by the Self-Healer after it has relaunched the daemon.
    pub async fn disconnect(&self) {
        *self.conn.lock().await = None;
    }

    /// Attempt to (re)establish the connection immediately, rather than
    /// waiting for the next `call` to notice it's missing. Used by the
    /// Self-Healer to confirm a relaunch actually worked before reporting
    /// success.
    pub async fn reconnect(&self) -> Result<(), NodeError> {
        let mut guard = self.conn.lock().await;
        *guard = None;
        self.ensure_connected(&mut guard).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "vendor_tests.rs"]
mod tests;
