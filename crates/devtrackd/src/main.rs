//! `devtrackd` — the attach/detach daemon core binary (§4.3, §4.4).
//!
//! Always runs in the foreground of its own process; backgrounding is
//! the supervisor's job (`devtrack_supervisor::spawn_detached` re-execs
//! this binary with `CSD_DEVTRACK_DAEMON=1` and a detached process
//! group).

mod presenter;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use devtrack_protocol::DEV_BUILD_HASH;
use devtrack_server::ServerContext;
use devtrack_transport::Endpoint;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use presenter::DemoPresenter;

#[derive(Parser)]
#[command(name = "devtrackd", about = "Attach/detach daemon core for devtrack")]
struct Args {
    /// Named instance (default instance if omitted).
    #[arg(long)]
    name: Option<String>,

    /// Path to a config file (currently unused by the demo presenter).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let instance_name = args
        .name
        .or_else(|| std::env::var("CSD_DEVTRACK_INSTANCE").ok())
        .unwrap_or_default();
    let _config_path = args
        .config
        .or_else(|| std::env::var("CSD_DEVTRACK_CONFIG").ok().map(PathBuf::from));

    let endpoint = match Endpoint::new(instance_name.clone()) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("invalid instance name {instance_name:?}: {e}");
            std::process::exit(1);
        }
    };

    let _log_guard = init_tracing(&endpoint);

    info!(instance = %endpoint.display_name(), "starting devtrackd");

    let started = match devtrack_supervisor::start(endpoint.clone()).await {
        Ok(started) => started,
        Err(e) => {
            error!(error = %e, "failed to start daemon");
            std::process::exit(1);
        }
    };

    let build_hash =
        std::env::var("CSD_DEVTRACK_BUILD_HASH").unwrap_or_else(|_| DEV_BUILD_HASH.to_string());
    let version = env!("CARGO_PKG_VERSION").to_string();

    let ctx = ServerContext::new(
        Arc::new(DemoPresenter::new()),
        build_hash,
        version,
        devtrack_protocol::DEFAULT_LOG_BUFFER_CAPACITY,
    );

    let shutdown = CancellationToken::new();
    let signal_ctx = ctx.clone();
    let signal_endpoint = started.endpoint.clone();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "failed to install shutdown signal handler");
            return;
        }
        info!("shutdown signal received, stopping gracefully");
        signal_ctx.shutdown(&signal_endpoint).await;
        signal_shutdown.cancel();
    });

    devtrack_server::run(ctx, started.listener, shutdown).await;
    info!("devtrackd exiting");
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = signal(SignalKind::terminate())?;
    let mut int = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = term.recv() => {}
        _ = int.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Rolling log file under the instance's state directory, plus an
/// env-filtered stdout layer — the same `tracing`/`tracing-subscriber`/
/// `tracing-appender` combination the teacher's daemon binary uses.
fn init_tracing(endpoint: &Endpoint) -> tracing_appender::non_blocking::WorkerGuard {
    use tracing_subscriber::prelude::*;

    let log_name = if endpoint.name.is_empty() {
        "daemon.log".to_string()
    } else {
        format!("{}.daemon.log", endpoint.name)
    };
    let appender = tracing_appender::rolling::never(&endpoint.base_dir, log_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}
