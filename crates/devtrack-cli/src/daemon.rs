//! `devtrack daemon` — daemon lifecycle commands (§4.3).

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use devtrack_transport::Endpoint;

use crate::binary::find_devtrackd_binary;

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background).
    Start {
        /// Run in the foreground instead of detaching.
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon.
    Stop,
    /// Check daemon status.
    Status,
    /// Stop and restart the daemon.
    Restart,
    /// View daemon logs.
    Logs {
        /// Number of recent lines to show.
        #[arg(short = 'n', long, default_value = "200")]
        limit: usize,
        /// Show all lines, ignoring `--limit`.
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
    },
    /// Remove stale PID/socket artifacts without starting anything.
    Wipe,
}

pub async fn run(args: DaemonArgs, name: &str) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(name, foreground).await,
        DaemonCommand::Stop => stop(name).await,
        DaemonCommand::Status => status(name).await,
        DaemonCommand::Restart => restart(name).await,
        DaemonCommand::Logs { limit, no_limit } => logs(name, limit, no_limit).await,
        DaemonCommand::Wipe => wipe(name).await,
    }
}

async fn start(name: &str, foreground: bool) -> Result<()> {
    let binary = find_devtrackd_binary()?;

    if foreground {
        let status = Command::new(&binary).arg("--name").arg(name).status()?;
        if !status.success() {
            return Err(anyhow!("daemon exited with status: {status}"));
        }
        return Ok(());
    }

    let endpoint = Endpoint::new(name)?;
    if devtrack_supervisor::is_running(&endpoint).await {
        println!("Daemon already running");
        return Ok(());
    }

    devtrack_supervisor::spawn_detached(
        &endpoint,
        &binary,
        &devtrack_supervisor::SpawnArgs { config_path: None, instance_name: name.to_string() },
    )
    .await
    .map_err(|e| anyhow!("failed to start daemon: {e}"))?;

    println!("Daemon started");
    Ok(())
}

async fn stop(name: &str) -> Result<()> {
    let endpoint = Endpoint::new(name)?;
    match devtrack_supervisor::stop(&endpoint).await {
        Ok(true) => {
            println!("Daemon stopped");
            Ok(())
        }
        Ok(false) => {
            println!("Daemon not running");
            Ok(())
        }
        Err(e) => Err(anyhow!("failed to stop daemon: {e}")),
    }
}

async fn restart(name: &str) -> Result<()> {
    let binary = find_devtrackd_binary()?;
    let endpoint = Endpoint::new(name)?;
    let was_running = devtrack_supervisor::stop(&endpoint)
        .await
        .map_err(|e| anyhow!("failed to stop daemon: {e}"))?;

    if was_running {
        // Not a synchronization hack — a grace period for the OS to
        // release the Unix socket after the daemon process exits.
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    devtrack_supervisor::spawn_detached(
        &endpoint,
        &binary,
        &devtrack_supervisor::SpawnArgs { config_path: None, instance_name: name.to_string() },
    )
    .await
    .map_err(|e| anyhow!("failed to restart daemon: {e}"))?;

    println!("Daemon restarted");
    Ok(())
}

async fn status(name: &str) -> Result<()> {
    let endpoint = Endpoint::new(name)?;
    if devtrack_supervisor::is_running(&endpoint).await {
        println!("Status: running");
        println!("Instance: {}", endpoint.display_name());
    } else {
        println!("Status: not running");
    }
    Ok(())
}

async fn logs(name: &str, limit: usize, no_limit: bool) -> Result<()> {
    let endpoint = Endpoint::new(name)?;
    let log_name = if name.is_empty() { "daemon.log".to_string() } else { format!("{name}.daemon.log") };
    let log_path: PathBuf = endpoint.base_dir.join(log_name);

    if !log_path.exists() {
        println!("No log file found at {}", log_path.display());
        return Ok(());
    }

    let content = if no_limit {
        std::fs::read_to_string(&log_path)?
    } else {
        read_last_lines(&log_path, limit)?
    };
    println!("{content}");
    Ok(())
}

async fn wipe(name: &str) -> Result<()> {
    let endpoint = Endpoint::new(name)?;
    devtrack_supervisor::wipe(&endpoint).await.map_err(|e| anyhow!("failed to wipe: {e}"))?;
    println!("Wiped stale artifacts for instance {:?}", endpoint.display_name());
    Ok(())
}

fn read_last_lines(path: &std::path::Path, n: usize) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().collect::<std::io::Result<_>>()?;
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}
