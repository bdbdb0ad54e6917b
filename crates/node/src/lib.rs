// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dfc-node: the on-premise node runner process (spec §2, §4.5-4.8).
//!
//! Three long-lived, independently wired pieces (spec §9 "Reconnect
//! ownership graph"): the [`VendorClient`] adapter to the local vendor
//! daemon, the [`SelfHealer`] that restarts it when it stops responding,
//! and the [`Executor`] that turns one JOB_ASSIGN into a JOB_ACK and a
//! JOB_RESULT. The [`SessionClient`] owns the outbound connection to the
//! gateway and rebuilds the per-connection outbound channel, sequence
//! counter, and heartbeat emitter fresh on every reconnect.

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod heartbeat;
pub mod outbound;
pub mod self_heal;
pub mod seq;
pub mod vendor;

pub use backoff::Backoff;
pub use client::SessionClient;
pub use error::NodeError;
pub use executor::Executor;
pub use heartbeat::{HeartbeatEmitter, LocalMetricsSampler, NullMetricsSampler};
pub use self_heal::{DaemonTarget, SelfHealer, FAILURE_THRESHOLD};
pub use seq::ConnectionSeq;
pub use vendor::VendorClient;
