//! Connection-replacement spec (spec §4.2 steps 1-3, §8 scenario 5).

use crate::prelude::*;

#[tokio::test]
async fn second_hello_for_same_node_id_replaces_the_first() {
    let orchestrator = OrchestratorProcess::start();

    let mut first = connect_fake_node(&orchestrator.ws_url()).await;
    first.hello("node-01").await;
    first.expect_hello_ack().await;

    let mut second = connect_fake_node(&orchestrator.ws_url()).await;
    second.hello("node-01").await;
    second.expect_hello_ack().await;

    // The displaced connection gets SERVER_SHUTDOWN, then the transport
    // closes.
    match first.recv_timeout(SPEC_WAIT_MAX_MS).await {
        Some(Envelope::ServerShutdown { .. }) => {}
        other => panic!("expected SERVER_SHUTDOWN on the replaced connection, got {other:?}"),
    }
    let closed = first.recv_timeout(SPEC_WAIT_MAX_MS).await;
    assert!(closed.is_none(), "the replaced connection's transport should close after SERVER_SHUTDOWN");

    let client = reqwest::Client::new();
    let nodes: serde_json::Value = client
        .get(format!("{}/nodes", orchestrator.base_url()))
        .send()
        .await
        .expect("GET /nodes")
        .json()
        .await
        .expect("decode nodes response");
    let online_entries: Vec<_> =
        nodes.as_array().into_iter().flatten().filter(|n| n["node_id"] == "node-01" && n["status"] == "online").collect();
    assert_eq!(online_entries.len(), 1, "exactly one online entry should remain for node-01");

    // The surviving (second) connection still answers for the node-id.
    let client = reqwest::Client::new();
    let url = format!("{}/command", orchestrator.base_url());
    let submit = tokio::spawn(async move {
        client
            .post(url)
            .json(&serde_json::json!({"node_id": "node-01", "action": "list"}))
            .send()
            .await
            .expect("POST /command")
    });

    let assign = second.expect_job_assign().await;
    second.ack_job(assign.job_id, JobAckState::Started).await;
    second.result_job(assign.job_id, JobResultState::Success, Metrics::from_duration(1), None).await;

    let response = submit.await.expect("submit task panicked");
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}
