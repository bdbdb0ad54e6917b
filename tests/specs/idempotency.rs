//! Idempotent replay spec (spec §4.6 `ExecutedKeySet`, §8 scenario 4).
//!
//! Driven at the node's wire boundary rather than through REST: a fresh REST
//! submission always derives its `idempotency_key` from its own generated
//! job-id, so two distinct `POST /command` calls can never collide on a key.
//! A fake gateway sending two JOB_ASSIGN frames that share one manually
//! chosen key is the only way to exercise replay suppression end-to-end.

use crate::prelude::*;

#[tokio::test]
async fn duplicate_idempotency_key_is_not_executed_twice() {
    let vendor = FakeVendor::start().await;
    let (gateway_url, listener) = bind_fake_gateway().await;
    let _node_process = NodeProcess::start("node-01", &gateway_url, &vendor.url);

    let mut gateway = accept_gateway_conn(listener).await;
    let hello = gateway.expect_hello().await;
    assert_eq!(hello.version, "1");
    gateway.send_hello_ack().await;

    let job_id = JobId::new();
    let params = ActionParams::new();
    gateway
        .send_job_assign(job_id, Action::List, params.clone(), vec!["dev-a".to_string()], "replay-key-1")
        .await;
    let first_ack = gateway.expect_job_ack().await;
    assert_eq!(first_ack.job_id, job_id);
    assert_eq!(first_ack.state, JobAckState::Started);
    let first_result = gateway.expect_job_result_timeout(SPEC_WAIT_MAX_MS).await.expect("first JOB_RESULT");
    assert_eq!(first_result.job_id, job_id);
    assert_eq!(first_result.state, JobResultState::Success);

    // Same idempotency key, a fresh job-id (the gateway resent it after a
    // dropped ACK, say) — the node must recognize the replay and answer
    // AlreadyDone without running the action again.
    let replay_job_id = JobId::new();
    gateway
        .send_job_assign(replay_job_id, Action::List, params, vec!["dev-a".to_string()], "replay-key-1")
        .await;
    let replay_ack = gateway.expect_job_ack().await;
    assert_eq!(replay_ack.job_id, replay_job_id);
    assert_eq!(replay_ack.state, JobAckState::AlreadyDone);

    // No second JOB_RESULT should follow a replay; the worker never re-runs.
    let second_result = gateway.expect_job_result_timeout(500).await;
    assert!(second_result.is_none(), "a replayed idempotency key must not produce a second JOB_RESULT");
}

#[tokio::test]
async fn distinct_idempotency_keys_both_execute() {
    let vendor = FakeVendor::start().await;
    let (gateway_url, listener) = bind_fake_gateway().await;
    let _node_process = NodeProcess::start("node-02", &gateway_url, &vendor.url);

    let mut gateway = accept_gateway_conn(listener).await;
    gateway.expect_hello().await;
    gateway.send_hello_ack().await;

    let job_a = JobId::new();
    gateway.send_job_assign(job_a, Action::List, ActionParams::new(), vec!["dev-a".to_string()], "key-a").await;
    gateway.expect_job_ack().await;
    let result_a = gateway.expect_job_result_timeout(SPEC_WAIT_MAX_MS).await.expect("JOB_RESULT for key-a");
    assert_eq!(result_a.job_id, job_a);

    let job_b = JobId::new();
    gateway.send_job_assign(job_b, Action::List, ActionParams::new(), vec!["dev-a".to_string()], "key-b").await;
    let ack_b = gateway.expect_job_ack().await;
    assert_eq!(ack_b.state, JobAckState::Started, "a distinct idempotency key must run normally");
    let result_b = gateway.expect_job_result_timeout(SPEC_WAIT_MAX_MS).await.expect("JOB_RESULT for key-b");
    assert_eq!(result_b.job_id, job_b);
}
