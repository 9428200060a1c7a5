use std::path::Path;
use std::time::{Duration, Instant};

use devtrack_transport::Endpoint;
use tokio::process::{Child, Command};

use crate::error::LifecycleError;
use crate::lifecycle::is_running;

const SPAWN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SPAWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Flags to pass to the backgrounded `devtrackd` process (§4.3).
#[derive(Debug, Clone, Default)]
pub struct SpawnArgs {
    pub config_path: Option<String>,
    pub instance_name: String,
}

/// Launch `devtrackd_path` as a background daemon process with
/// `CSD_DEVTRACK_DAEMON=1`, then poll `IsRunning` at ~100ms intervals for
/// up to 3s before declaring failure (§4.3). The caller resolves the
/// binary path (the CLI and the daemon are separate executables here,
/// unlike the teacher's single re-exec'd binary).
pub async fn spawn_detached(
    endpoint: &Endpoint,
    devtrackd_path: &Path,
    args: &SpawnArgs,
) -> Result<(), LifecycleError> {
    let mut command = Command::new(devtrackd_path);
    command.env("CSD_DEVTRACK_DAEMON", "1").env("CSD_DEVTRACK_INSTANCE", &args.instance_name);
    if let Some(config) = &args.config_path {
        command.env("CSD_DEVTRACK_CONFIG", config);
    }
    command.stdin(std::process::Stdio::null());
    command.stdout(std::process::Stdio::null());
    command.stderr(std::process::Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // New session so the daemon survives the launching shell exiting.
        command.process_group(0);
    }

    let _child: Child = command.spawn()?;

    let deadline = Instant::now() + SPAWN_TIMEOUT;
    while Instant::now() < deadline {
        if is_running(endpoint).await {
            return Ok(());
        }
        tokio::time::sleep(SPAWN_POLL_INTERVAL).await;
    }

    Err(LifecycleError::SpawnTimeout)
}
