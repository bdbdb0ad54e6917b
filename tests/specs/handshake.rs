//! Handshake specs (spec §4.2, §8 scenario 1).

use crate::prelude::*;

#[tokio::test]
async fn happy_handshake_registers_node_as_online() {
    let orchestrator = OrchestratorProcess::start();
    let mut node = connect_fake_node(&orchestrator.ws_url()).await;

    node.hello("node-01").await;
    let ack = node.expect_hello_ack().await;
    assert!(!ack.server_time.is_empty(), "HELLO_ACK should carry a non-empty server_time");

    let client = reqwest::Client::new();
    let url = format!("{}/nodes", orchestrator.base_url());
    let found = wait_for_async(SPEC_WAIT_MAX_MS, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let Ok(resp) = client.get(url).send().await else { return false };
            let Ok(nodes) = resp.json::<serde_json::Value>().await else { return false };
            nodes
                .as_array()
                .into_iter()
                .flatten()
                .any(|n| n["node_id"] == "node-01" && n["status"] == "online")
        }
    })
    .await;
    assert!(found, "node-01 should appear online in GET /nodes within one sweep period");
}

#[tokio::test]
async fn hello_with_empty_node_id_is_rejected() {
    let orchestrator = OrchestratorProcess::start();
    let mut node = connect_fake_node(&orchestrator.ws_url()).await;

    node.hello("").await;
    // The listener closes the transport with "missing node_id" rather than
    // replying with a HELLO_ACK (spec §6 close code 4003).
    let outcome = node.recv_timeout(2_000).await;
    assert!(outcome.is_none(), "connection should close, not reply, for an empty node_id");
}

#[tokio::test]
async fn malformed_first_frame_closes_with_expected_hello() {
    let orchestrator = OrchestratorProcess::start();
    let mut node = connect_fake_node(&orchestrator.ws_url()).await;

    // A HEARTBEAT before any HELLO is a protocol violation (spec §4.2).
    node.set_node_id("node-02");
    node.send_heartbeat(HeartbeatPayload {
        device_count: 1,
        laixi_status: "ok".to_string(),
        adb_status: "ok".to_string(),
        cpu: 0.1,
        mem: 0.1,
    })
    .await;

    let outcome = node.recv_timeout(2_000).await;
    assert!(outcome.is_none(), "listener should close the transport rather than process a pre-HELLO frame");
}
