// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Abstract job actions and their parameters.
//!
//! `Action` is the verb half of a job; `ActionParams` is a tagged union
//! over the params each verb actually needs, with an opaque fallback for
//! pass-through actions (`adb`) whose payload the core has no business
//! interpreting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the abstract verbs a job can carry. Two of these
/// (`RestartVendorDaemon`, `RestartDeviceBridge`) never reach the vendor
/// daemon directly; the node's Self-Healer intercepts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    List,
    Watch,
    Tap,
    Swipe,
    Adb,
    Home,
    Back,
    CurrentApp,
    RestartVendorDaemon,
    RestartDeviceBridge,
}

crate::simple_display! {
    Action {
        List => "list",
        Watch => "watch",
        Tap => "tap",
        Swipe => "swipe",
        Adb => "adb",
        Home => "home",
        Back => "back",
        CurrentApp => "current_app",
        RestartVendorDaemon => "restart-vendor-daemon",
        RestartDeviceBridge => "restart-device-bridge",
    }
}

impl Action {
    /// True for the two actions the Self-Healer handles locally instead of
    /// forwarding to the vendor daemon.
    pub fn is_recovery(self) -> bool {
        matches!(self, Action::RestartVendorDaemon | Action::RestartDeviceBridge)
    }
}

/// An action string that didn't match any known [`Action`] variant.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown action: {0:?}")]
pub struct UnknownActionError(pub String);

impl std::str::FromStr for Action {
    type Err = UnknownActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "list" => Action::List,
            "watch" => Action::Watch,
            "tap" => Action::Tap,
            "swipe" => Action::Swipe,
            "adb" => Action::Adb,
            "home" => Action::Home,
            "back" => Action::Back,
            "current_app" => Action::CurrentApp,
            "restart-vendor-daemon" => Action::RestartVendorDaemon,
            "restart-device-bridge" => Action::RestartDeviceBridge,
            other => return Err(UnknownActionError(other.to_string())),
        })
    }
}

/// Opaque key-value params bag for a job.
///
/// Kept as a flat string-keyed map rather than one variant per action: the
/// node's executor is the only thing that knows how to validate and extract
/// fields for a given action (see `dfc-node`'s action translation table),
/// and it does so by action-specific accessor, not by matching on this type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionParams(pub BTreeMap<String, serde_json::Value>);

impl ActionParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.as_i64())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }
}

impl From<BTreeMap<String, serde_json::Value>> for ActionParams {
    fn from(map: BTreeMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
