use std::path::Path;
use std::time::{Duration, Instant};

use devtrack_transport::{self as transport, Endpoint, Listener};
use tracing::{info, warn};

use crate::error::LifecycleError;

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const KILL_GRACE: Duration = Duration::from_millis(500);

/// The bound listener plus the endpoint it was started on, returned by
/// `start` so the caller can hand the listener to the server core.
pub struct StartedDaemon {
    pub endpoint: Endpoint,
    pub listener: Listener,
}

/// `IsRunning` (§4.3): true iff the PID file parses, that process is
/// alive, and the socket is dialable within a short bound. Any failing
/// condition triggers ownership-guarded cleanup, making this
/// self-healing against crashed daemons (testable property 7).
pub async fn is_running(endpoint: &Endpoint) -> bool {
    let Some(pid) = read_pid(&endpoint.pid_path).await else {
        return false;
    };

    if !process_exists(pid) {
        info!(pid, "stale pid file: process does not exist, cleaning up");
        cleanup_owned_artifacts(endpoint).await;
        return false;
    }

    match transport::dial(endpoint, transport::liveness_dial_timeout()).await {
        Ok(_conn) => true,
        Err(_) => {
            info!(pid, "process alive but socket not connectable, cleaning up");
            cleanup_owned_artifacts(endpoint).await;
            false
        }
    }
}

/// Start the daemon: refuse if already running, clear stale artifacts,
/// bind the listener, and write the PID file. Returns once the endpoint
/// is ready to accept (§4.3).
pub async fn start(endpoint: Endpoint) -> Result<StartedDaemon, LifecycleError> {
    if is_running(&endpoint).await {
        return Err(LifecycleError::AlreadyRunning);
    }

    cleanup_owned_artifacts(&endpoint).await;

    let listener = transport::listen(&endpoint).await?;
    write_pid_file(&endpoint).await?;

    Ok(StartedDaemon { endpoint, listener })
}

/// Stop the daemon: SIGTERM (or the platform terminate primitive), poll
/// up to 5s, escalate to SIGKILL, poll a short grace period, then fail
/// hard if it is still alive (§4.3, testable scenario S6).
///
/// Returns `Ok(false)` if the daemon was not running to begin with.
pub async fn stop(endpoint: &Endpoint) -> Result<bool, LifecycleError> {
    let Some(pid) = read_pid(&endpoint.pid_path).await else {
        return Ok(false);
    };
    if !process_exists(pid) {
        cleanup_owned_artifacts(endpoint).await;
        return Ok(false);
    }

    terminate(pid);
    if poll_until_dead(pid, STOP_TIMEOUT).await {
        cleanup_owned_artifacts(endpoint).await;
        return Ok(true);
    }

    warn!(pid, "daemon did not exit within stop timeout, escalating to SIGKILL");
    kill(pid);
    if poll_until_dead(pid, KILL_GRACE).await {
        cleanup_owned_artifacts(endpoint).await;
        return Ok(true);
    }

    Err(LifecycleError::StopTimeout)
}

/// Forced cleanup of PID and socket files; refuses while the daemon is
/// live (§4.3). Idempotent: a second call finds nothing to remove.
pub async fn wipe(endpoint: &Endpoint) -> Result<(), LifecycleError> {
    if is_running(endpoint).await {
        return Err(LifecycleError::AlreadyRunning);
    }
    cleanup_owned_artifacts(endpoint).await;
    Ok(())
}

/// Enumerate instances under the base directory: the default instance
/// (if its PID file exists) first, then named instances in ascending
/// lexicographic order (§4.3).
pub async fn list_instances(base_dir: &Path) -> std::io::Result<Vec<String>> {
    let mut named = Vec::new();
    let mut has_default = false;

    let mut entries = match tokio::fs::read_dir(base_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if name == "daemon.pid" {
            has_default = true;
        } else if let Some(instance) = name.strip_suffix(".daemon.pid") {
            named.push(instance.to_string());
        }
    }

    named.sort();
    let mut result = Vec::with_capacity(named.len() + 1);
    if has_default {
        result.push(String::new());
    }
    result.extend(named);
    Ok(result)
}

async fn poll_until_dead(pid: i32, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if !process_exists(pid) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(STOP_POLL_INTERVAL).await;
    }
}

async fn read_pid(path: &Path) -> Option<i32> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    text.trim().parse::<i32>().ok()
}

async fn write_pid_file(endpoint: &Endpoint) -> Result<(), LifecycleError> {
    let pid = std::process::id();
    tokio::fs::write(&endpoint.pid_path, pid.to_string()).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&endpoint.pid_path, std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    Ok(())
}

/// Remove PID/socket/addr artifacts, but only those owned by the
/// current user (§3 invariant 6, §9 "stale artifact ownership").
async fn cleanup_owned_artifacts(endpoint: &Endpoint) {
    remove_if_owned(&endpoint.pid_path).await;
    remove_if_owned(&endpoint.socket_path).await;
    remove_if_owned(&endpoint.addr_path()).await;
}

#[cfg(unix)]
async fn remove_if_owned(path: &Path) {
    use std::os::unix::fs::MetadataExt;
    let Ok(meta) = tokio::fs::metadata(path).await else { return };
    if meta.uid() == nix::unistd::Uid::current().as_raw() {
        let _ = tokio::fs::remove_file(path).await;
    }
}

#[cfg(not(unix))]
async fn remove_if_owned(path: &Path) {
    // Non-Unix filesystems are assumed per-user (§9); cleanup is
    // unconditional there.
    let _ = tokio::fs::remove_file(path).await;
}

#[cfg(unix)]
fn process_exists(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
fn process_exists(pid: i32) -> bool {
    let system = sysinfo::System::new_all();
    system.process(sysinfo::Pid::from_u32(pid as u32)).is_some()
}

#[cfg(unix)]
fn terminate(pid: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid), Signal::SIGTERM);
}

#[cfg(not(unix))]
fn terminate(pid: i32) {
    // No graceful-terminate primitive on non-Unix; go straight to kill.
    kill(pid);
}

#[cfg(unix)]
fn kill(pid: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
}

#[cfg(not(unix))]
fn kill(pid: i32) {
    let system = sysinfo::System::new_all();
    if let Some(process) = system.process(sysinfo::Pid::from_u32(pid as u32)) {
        process.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devtrack_transport::Endpoint;
    use std::path::PathBuf;

    #[tokio::test]
    async fn is_running_self_heals_a_stale_pid_file() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::from_base_dir("", dir.path().to_path_buf());
        tokio::fs::create_dir_all(&endpoint.base_dir).await.unwrap();
        // A PID no live process is likely to hold.
        tokio::fs::write(&endpoint.pid_path, "999999").await.unwrap();
        tokio::fs::write(&endpoint.socket_path, "not a real socket").await.unwrap();

        assert!(!is_running(&endpoint).await);
        assert!(!endpoint.pid_path.exists());
        assert!(!endpoint.socket_path.exists());
    }

    #[tokio::test]
    async fn list_instances_orders_default_first_then_lexicographic() {
        let dir = tempfile::tempdir().unwrap();
        let base: PathBuf = dir.path().to_path_buf();
        tokio::fs::write(base.join("daemon.pid"), "1").await.unwrap();
        tokio::fs::write(base.join("zeta.daemon.pid"), "1").await.unwrap();
        tokio::fs::write(base.join("alpha.daemon.pid"), "1").await.unwrap();

        let instances = list_instances(&base).await.unwrap();
        assert_eq!(instances, vec!["".to_string(), "alpha".to_string(), "zeta".to_string()]);
    }

    #[tokio::test]
    async fn wipe_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let endpoint = Endpoint::from_base_dir("", dir.path().to_path_buf());
        tokio::fs::create_dir_all(&endpoint.base_dir).await.unwrap();
        wipe(&endpoint).await.unwrap();
        wipe(&endpoint).await.unwrap();
    }
}
