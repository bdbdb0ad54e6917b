// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dfc`: the operator CLI (spec §4.12). Talks to the orchestrator's REST
//! surface only, and shells out to start/stop the orchestrator and node
//! binaries locally; it has no privileged access beyond what `/command`,
//! `/nodes` and `/health` expose.

mod output;
mod rest;
mod supervise;

use anyhow::Result;
use clap::{Parser, Subcommand};
use dfc_core::ActionParams;
use output::{format_or_json, OutputFormat};
use rest::GatewayClient;
use supervise::Process;

#[derive(Parser)]
#[command(name = "dfc", version, about = "Operate the device-farm control plane")]
struct Cli {
    /// Orchestrator REST base URL.
    #[arg(long, env = "DFC_ORCHESTRATOR_URL", default_value = "http://127.0.0.1:7443", global = true)]
    orchestrator_url: String,

    /// Output format.
    #[arg(long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Submit a command to a node's device(s).
    Command {
        node_id: String,
        action: String,
        /// Target a single device by serial; omit to target all.
        #[arg(long)]
        device: Option<String>,
        /// Extra action params as key=value, repeatable. Values are parsed
        /// as JSON when possible, otherwise kept as strings.
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, serde_json::Value)>,
    },
    /// List nodes currently connected to the orchestrator.
    Nodes,
    /// Report orchestrator health.
    Health,
    /// Manage the local orchestrator process.
    Orchestrator {
        #[command(subcommand)]
        action: ProcessCommand,
    },
    /// Manage the local node process.
    Node {
        #[command(subcommand)]
        action: ProcessCommand,
    },
}

#[derive(Subcommand)]
enum ProcessCommand {
    Start,
    Stop,
    Status,
}

fn parse_param(s: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected key=value, got {s:?}"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Command { node_id, action, device, params } => {
            let client = GatewayClient::new(cli.orchestrator_url);
            let mut action_params = ActionParams::new();
            for (k, v) in params {
                action_params.insert(k, v);
            }
            let response = client.submit_command(node_id, action, device, action_params).await?;
            format_or_json(cli.format, &response, || {
                if response.success {
                    println!("ok");
                    if let Some(result) = &response.result {
                        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
                    }
                } else {
                    println!("failed: {}", response.error.as_deref().unwrap_or("unknown error"));
                }
            })?;
            if !response.success {
                std::process::exit(1);
            }
        }
        Command::Nodes => {
            let client = GatewayClient::new(cli.orchestrator_url);
            let nodes = client.list_nodes().await?;
            format_or_json(cli.format, &nodes, || {
                if nodes.is_empty() {
                    println!("No nodes connected.");
                    return;
                }
                for n in &nodes {
                    println!("{}\t{}\tdevices={}", n.node_id, n.status, n.device_count);
                }
            })?;
        }
        Command::Health => {
            let client = GatewayClient::new(cli.orchestrator_url);
            let health = client.health().await?;
            format_or_json(cli.format, &health, || {
                println!("status: {}", health.status);
                println!("live_sessions: {}", health.live_sessions);
            })?;
        }
        Command::Orchestrator { action } => run_process_command(Process::Orchestrator, action)?,
        Command::Node { action } => run_process_command(Process::Node, action)?,
    }

    Ok(())
}

fn run_process_command(process: Process, action: ProcessCommand) -> Result<()> {
    match action {
        ProcessCommand::Start => supervise::start(process),
        ProcessCommand::Stop => supervise::stop(process),
        ProcessCommand::Status => supervise::status(process),
    }
}
