// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local process supervision for `dfc orchestrator start|stop|status` and
//! `dfc node start|stop|status` (spec §4.12). Deliberately simpler than the
//! daemon crate's Unix-socket `DaemonClient`: the CLI has no privileged
//! channel into either process, so "status" here means "is a pid alive",
//! not "ask it how it's doing" — that's what `dfc health` is for.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use std::process::Command;

/// Which long-running process a pidfile tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Process {
    Orchestrator,
    Node,
}

impl Process {
    fn binary_name(self) -> &'static str {
        match self {
            Process::Orchestrator => "dfc-orchestratord",
            Process::Node => "dfc-noded",
        }
    }

    fn pidfile_name(self) -> &'static str {
        match self {
            Process::Orchestrator => "orchestrator.pid",
            Process::Node => "node.pid",
        }
    }
}

/// Resolve state directory: DFC_STATE_DIR > XDG_STATE_HOME/dfc > ~/.local/state/dfc
fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("DFC_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("dfc"));
    }
    let home = std::env::var("HOME").context("HOME is not set; cannot locate state directory")?;
    Ok(PathBuf::from(home).join(".local/state/dfc"))
}

fn pidfile_path(process: Process) -> Result<PathBuf> {
    Ok(state_dir()?.join(process.pidfile_name()))
}

fn read_pid(process: Process) -> Result<Option<u32>> {
    let path = pidfile_path(process)?;
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(contents.trim().parse::<u32>().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading pidfile {}", path.display())),
    }
}

fn pid_is_alive(pid: u32) -> bool {
    Command::new("kill").arg("-0").arg(pid.to_string()).status().map(|s| s.success()).unwrap_or(false)
}

/// Finds the sibling binary next to the running `dfc` executable, falling
/// back to a PATH lookup — mirroring how `oj`'s CLI locates `ojd`.
fn find_binary(process: Process) -> PathBuf {
    let name = process.binary_name();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join(name);
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from(name)
}

pub fn start(process: Process) -> Result<()> {
    if let Some(pid) = read_pid(process)? {
        if pid_is_alive(pid) {
            println!("{} already running (pid {pid})", process.binary_name());
            return Ok(());
        }
    }

    let dir = state_dir()?;
    std::fs::create_dir_all(&dir).with_context(|| format!("creating state directory {}", dir.display()))?;

    let binary = find_binary(process);
    let log_path = dir.join(format!("{}.log", process.pidfile_name().trim_end_matches(".pid")));
    let log_file = std::fs::File::create(&log_path).with_context(|| format!("creating log file {}", log_path.display()))?;
    let log_file_err = log_file.try_clone().context("cloning log file handle")?;

    let child = Command::new(&binary)
        .stdout(log_file)
        .stderr(log_file_err)
        .spawn()
        .with_context(|| format!("spawning {}", binary.display()))?;

    std::fs::write(pidfile_path(process)?, child.id().to_string())?;
    println!("{} started (pid {}, logs at {})", process.binary_name(), child.id(), log_path.display());
    Ok(())
}

pub fn stop(process: Process) -> Result<()> {
    let Some(pid) = read_pid(process)? else {
        println!("{} not running", process.binary_name());
        return Ok(());
    };
    if !pid_is_alive(pid) {
        println!("{} not running", process.binary_name());
        let _ = std::fs::remove_file(pidfile_path(process)?);
        return Ok(());
    }

    let status = Command::new("kill")
        .arg(pid.to_string())
        .status()
        .with_context(|| format!("sending SIGTERM to pid {pid}"))?;
    if !status.success() {
        return Err(anyhow!("kill exited with {status} for pid {pid}"));
    }

    let _ = std::fs::remove_file(pidfile_path(process)?);
    println!("{} stopped (pid {pid})", process.binary_name());
    Ok(())
}

pub fn status(process: Process) -> Result<()> {
    match read_pid(process)? {
        Some(pid) if pid_is_alive(pid) => println!("{} running (pid {pid})", process.binary_name()),
        Some(_) => println!("{} not running (stale pidfile)", process.binary_name()),
        None => println!("{} not running", process.binary_name()),
    }
    Ok(())
}

#[cfg(test)]
#[path = "supervise_tests.rs"]
mod tests;
