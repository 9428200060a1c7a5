//! `devtrack attach` — connect to a running daemon and stream state,
//! logs, and notifications to stdout (§4.5, §4.6). No TUI rendering
//! lives in this crate; the view layer is out of scope here (§2).

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Args;
use devtrack_client::{ClientPresenter, DaemonClient};
use devtrack_protocol::{ConfigMode, FocusArea, TuiState, ViewType, DEV_BUILD_HASH};
use devtrack_transport::Endpoint;

#[derive(Args)]
pub struct AttachArgs {}

pub async fn run(_args: AttachArgs, name: &str) -> Result<()> {
    let endpoint = Endpoint::new(name)?;

    if !devtrack_supervisor::is_running(&endpoint).await {
        return Err(anyhow!("daemon is not running; start it with `devtrack daemon start`"));
    }

    let build_hash =
        std::env::var("CSD_DEVTRACK_BUILD_HASH").unwrap_or_else(|_| DEV_BUILD_HASH.to_string());
    let version = env!("CARGO_PKG_VERSION").to_string();

    let client = DaemonClient::connect(
        &endpoint,
        devtrack_transport::liveness_dial_timeout(),
        build_hash,
        version,
    )
    .await
    .map_err(|e| anyhow!("failed to connect: {e}"))?;

    client.on_version_mismatch(Arc::new(|server_version, server_hash| {
        eprintln!(
            "warning: daemon build {server_hash} (v{server_version}) does not match this client; a restart may be needed"
        );
    }));
    client.on_disconnect(Arc::new(|| {
        println!("disconnected from daemon");
    }));

    let presenter = ClientPresenter::init(&client).await;

    presenter.subscribe(Arc::new(|view_type, view_model| {
        if view_type == ViewType::Logs {
            return;
        }
        println!("[{view_type:?}] {view_model:?}");
    }));
    presenter.subscribe_notifications(Arc::new(|notification| {
        println!("[notify] {}: {}", notification.title, notification.body);
    }));
    presenter.on_tui_state(Arc::new(|tui_state| {
        println!("[tui_state restored] view={}", tui_state.current_view);
    }));

    println!("Attached to instance {:?}. Press Ctrl+C to detach.", endpoint.display_name());

    tokio::signal::ctrl_c().await?;
    println!("\ndetaching...");

    client
        .save_tui_state(detached_tui_state())
        .await
        .map_err(|e| anyhow!("failed to save TUI state on detach: {e}"))?;
    client.disconnect().await;

    Ok(())
}

/// Placeholder custody value for a headless attach session with no
/// actual TUI to describe (§3: the core treats this value as opaque).
fn detached_tui_state() -> TuiState {
    TuiState {
        current_view: "root".to_string(),
        focus_area: FocusArea::Sidebar,
        sidebar_selection: 0,
        main_selection: 0,
        detail_selection: 0,
        main_scroll: 0,
        detail_scroll: 0,
        config_mode: ConfigMode::Projects,
        browser_path: None,
        log_level_filter: None,
        log_source_filter: None,
        log_type_filter: None,
        log_search_filter: None,
        log_scroll_offset: 0,
        log_auto_scroll: true,
        git_show_diff: false,
        active_build_profile: None,
    }
}
