//! Heartbeat timeout spec (spec §4.3, §8 scenario 3).

use crate::prelude::*;

#[tokio::test]
async fn stale_heartbeat_marks_node_offline_and_fails_new_submissions() {
    let orchestrator = OrchestratorProcess::start_with_fast_sweep(1, 1);
    let mut node = connect_fake_node(&orchestrator.ws_url()).await;
    node.hello("node-01").await;
    node.expect_hello_ack().await;

    let client = reqwest::Client::new();
    let nodes_url = format!("{}/nodes", orchestrator.base_url());
    let went_offline = wait_for_async(SPEC_WAIT_MAX_MS, || {
        let client = client.clone();
        let nodes_url = nodes_url.clone();
        async move {
            let Ok(resp) = client.get(nodes_url).send().await else { return false };
            let Ok(nodes) = resp.json::<serde_json::Value>().await else { return false };
            nodes
                .as_array()
                .into_iter()
                .flatten()
                .any(|n| n["node_id"] == "node-01" && n["status"] == "offline")
        }
    })
    .await;
    assert!(went_offline, "sweeper should flip a heartbeat-timed-out node offline within one tick");

    let response = client
        .post(format!("{}/command", orchestrator.base_url()))
        .json(&serde_json::json!({"node_id": "node-01", "action": "list"}))
        .send()
        .await
        .expect("POST /command");
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    let body: serde_json::Value = response.json().await.expect("decode REST response");
    assert_eq!(body["success"], false);

    // Keep the fake connection alive until after the assertions above so the
    // offline transition is purely heartbeat-driven, not a transport close.
    drop(node);
}

#[tokio::test]
async fn resumed_heartbeats_keep_a_session_online() {
    let orchestrator = OrchestratorProcess::start_with_fast_sweep(2, 1);
    let mut node = connect_fake_node(&orchestrator.ws_url()).await;
    node.hello("node-01").await;
    node.expect_hello_ack().await;

    let healthy = HeartbeatPayload {
        device_count: 4,
        laixi_status: "ok".to_string(),
        adb_status: "ok".to_string(),
        cpu: 0.2,
        mem: 0.3,
    };
    for _ in 0..3 {
        node.send_heartbeat(healthy.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(900)).await;
    }

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/nodes", orchestrator.base_url()))
        .send()
        .await
        .expect("GET /nodes")
        .json::<serde_json::Value>()
        .await
        .expect("decode nodes response");
    let still_online = resp.as_array().into_iter().flatten().any(|n| n["node_id"] == "node-01" && n["status"] == "online");
    assert!(still_online, "a node that keeps heartbeating must never be swept offline");
}
